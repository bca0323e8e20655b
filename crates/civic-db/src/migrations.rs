use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

const MINISTRIES: &[(i64, &str, &str)] = &[
    (1, "Ministère de l'Intérieur", "Sécurité intérieure, administration territoriale et décentralisation"),
    (2, "Ministère de l'Éducation", "Enseignement primaire, secondaire et professionnel"),
    (3, "Ministère de la Santé", "Santé publique, hôpitaux et programmes de vaccination"),
    (4, "Ministère des Infrastructures", "Routes, ponts et bâtiments publics"),
    (5, "Ministère de l'Agriculture", "Agriculture, élevage et sécurité alimentaire"),
    (6, "Ministère des Finances", "Budget national, fiscalité et trésor public"),
    (7, "Ministère de la Justice", "Système judiciaire, droits humains et réformes légales"),
    (8, "Ministère des Ressources Hydrauliques", "Accès à l'eau potable et gestion des ressources en eau"),
    (9, "Ministère de l'Énergie", "Électrification, énergie renouvelable et distribution"),
    (10, "Ministère des Transports", "Transport public, aviation civile et navigation"),
    (11, "Ministère de l'Environnement", "Protection de l'environnement et développement durable"),
    (12, "Ministère du Numérique", "Transformation digitale et télécommunications"),
];

const PROVINCES: &[&str] = &[
    "Kinshasa", "Kongo-Central", "Kwango", "Kwilu", "Mai-Ndombe", "Équateur", "Mongala",
    "Nord-Ubangi", "Sud-Ubangi", "Tshuapa", "Tshopo", "Bas-Uele", "Haut-Uele", "Ituri",
    "Nord-Kivu", "Sud-Kivu", "Maniema", "Haut-Katanga", "Haut-Lomami", "Lualaba", "Tanganyika",
    "Lomami", "Sankuru", "Kasaï", "Kasaï-Central", "Kasaï-Oriental",
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'citizen'
                                CHECK (role IN ('citizen', 'ministry_responsible', 'admin')),
                created_at      TEXT NOT NULL
            );

            CREATE TABLE ministries (
                id              INTEGER PRIMARY KEY,
                name            TEXT NOT NULL UNIQUE,
                description     TEXT,
                attributions    TEXT
            );

            CREATE TABLE provinces (
                id              INTEGER PRIMARY KEY,
                name            TEXT NOT NULL UNIQUE,
                government      TEXT
            );

            CREATE TABLE proposals (
                id                  TEXT PRIMARY KEY,
                author_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                ministry_id         INTEGER REFERENCES ministries(id),
                province_id         INTEGER REFERENCES provinces(id),
                problem             TEXT NOT NULL,
                solution            TEXT NOT NULL,
                impact              TEXT,
                status              TEXT NOT NULL DEFAULT 'received'
                                    CHECK (status IN ('received', 'under_analysis', 'retained', 'in_execution')),
                official_response   TEXT,
                moderation_score    INTEGER NOT NULL DEFAULT 0
                                    CHECK (moderation_score BETWEEN 0 AND 100),
                flagged_for_review  INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                CHECK (ministry_id IS NOT NULL OR province_id IS NOT NULL)
            );

            CREATE INDEX idx_proposals_created ON proposals(created_at);

            CREATE TABLE votes (
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                proposal_id     TEXT NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
                kind            TEXT NOT NULL CHECK (kind IN ('like', 'dislike')),
                updated_at      TEXT NOT NULL,
                PRIMARY KEY (user_id, proposal_id)
            );

            CREATE INDEX idx_votes_proposal ON votes(proposal_id);

            CREATE TABLE comments (
                id                  TEXT PRIMARY KEY,
                proposal_id         TEXT NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
                author_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content             TEXT NOT NULL,
                moderation_score    INTEGER NOT NULL DEFAULT 0
                                    CHECK (moderation_score BETWEEN 0 AND 100),
                flagged_for_review  INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_comments_proposal ON comments(proposal_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
        seed_reference_data(conn)?;
    }

    info!("Database migrations complete");
    Ok(())
}

fn seed_reference_data(conn: &Connection) -> Result<()> {
    let mut ministry = conn.prepare(
        "INSERT OR IGNORE INTO ministries (id, name, description) VALUES (?1, ?2, ?3)",
    )?;
    for (id, name, description) in MINISTRIES {
        ministry.execute(rusqlite::params![id, name, description])?;
    }

    let mut province = conn.prepare("INSERT OR IGNORE INTO provinces (id, name) VALUES (?1, ?2)")?;
    for (i, name) in PROVINCES.iter().enumerate() {
        province.execute(rusqlite::params![i as i64 + 1, name])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn reference_data_is_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        let provinces: i64 =
            conn.query_row("SELECT COUNT(*) FROM provinces", [], |r| r.get(0)).unwrap();
        assert_eq!(provinces, 26);
        let ministries: i64 =
            conn.query_row("SELECT COUNT(*) FROM ministries", [], |r| r.get(0)).unwrap();
        assert_eq!(ministries, MINISTRIES.len() as i64);
    }
}
