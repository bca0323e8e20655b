use std::future::Future;

/// Score and flag persisted alongside moderated content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModerationVerdict {
    /// 0..=100
    pub score: u8,
    pub flagged: bool,
}

/// Result of consulting the moderation oracle. Every variant yields a
/// verdict; unavailability is an outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ModerationOutcome {
    Scored(ModerationVerdict),
    /// Moderation is switched off by configuration.
    Disabled,
    /// The oracle could not be reached or answered garbage. Fails open.
    Unavailable(String),
}

impl ModerationOutcome {
    /// Builds an outcome from the oracle's raw answer. The flag is kept as
    /// given and never derived from the probability.
    pub fn from_oracle(flagged: bool, probability: f64) -> Self {
        Self::Scored(ModerationVerdict {
            score: score_from_probability(probability),
            flagged,
        })
    }

    pub fn verdict(&self) -> ModerationVerdict {
        match self {
            Self::Scored(verdict) => *verdict,
            Self::Disabled | Self::Unavailable(_) => ModerationVerdict::default(),
        }
    }
}

/// Something that can score a text blob for review.
pub trait Moderator: Send + Sync + 'static {
    fn check(&self, text: &str) -> impl Future<Output = ModerationOutcome> + Send;
}

/// Probability in [0, 1] to an integer percentage, clamped to [0, 100].
pub fn score_from_probability(probability: f64) -> u8 {
    if !probability.is_finite() {
        return 0;
    }
    (probability * 100.0).round().clamp(0.0, 100.0) as u8
}

/// The single blob submitted for a proposition.
pub fn proposal_text(problem: &str, solution: &str, impact: Option<&str>) -> String {
    let mut parts = vec![problem, solution];
    if let Some(impact) = impact {
        parts.push(impact);
    }
    parts.join("\n")
}
