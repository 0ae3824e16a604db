use crate::error::AlertError;
use crate::posture::Outcome;
use spinespy_types::async_trait;

/// Consecutive bad checks needed before the alert sounds
pub const BAD_STREAK_LIMIT: u32 = 5;

/// Plays the audible alert
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn play(&self) -> Result<(), AlertError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertDecision {
    /// A good check cleared the streak
    Reset,
    /// A bad check extended the streak without reaching the limit
    Counting(u32),
    /// The streak reached the limit and was cleared
    Fire,
}

/// Debounces bad outcomes into alerts
#[derive(Clone, Debug)]
pub struct AlertController {
    streak: u32,
    limit: u32,
}

impl Default for AlertController {
    fn default() -> Self {
        Self::new(BAD_STREAK_LIMIT)
    }
}

impl AlertController {
    pub fn new(limit: u32) -> Self {
        Self {
            streak: 0,
            limit: limit.max(1),
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn record(&mut self, outcome: &Outcome) -> AlertDecision {
        let Outcome::Bad(reason) = outcome else {
            self.streak = 0;
            return AlertDecision::Reset;
        };

        self.streak += 1;
        tracing::info!(
            %reason,
            streak = self.streak,
            limit = self.limit,
            "bad posture streak {}/{}",
            self.streak,
            self.limit
        );

        if self.streak >= self.limit {
            self.streak = 0;
            return AlertDecision::Fire;
        }
        AlertDecision::Counting(self.streak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posture::BadReason;

    const BAD: Outcome = Outcome::Bad(BadReason::Slouching);

    #[test]
    fn counts_up_to_the_limit() {
        let mut alerts = AlertController::default();
        for n in 1..BAD_STREAK_LIMIT {
            assert_eq!(alerts.record(&BAD), AlertDecision::Counting(n));
            assert_eq!(alerts.streak(), n);
        }
        assert_eq!(alerts.record(&BAD), AlertDecision::Fire);
        assert_eq!(alerts.streak(), 0);
    }

    #[test]
    fn fires_once_per_full_streak() {
        let mut alerts = AlertController::default();
        let fired = (0..9)
            .map(|_| alerts.record(&BAD))
            .filter(|decision| *decision == AlertDecision::Fire)
            .count();
        assert_eq!(fired, 1);
        assert_eq!(alerts.streak(), 4);
    }

    #[test]
    fn good_forgives_everything() {
        let mut alerts = AlertController::default();
        for _ in 0..4 {
            alerts.record(&Outcome::Bad(BadReason::PhoneDetected));
        }
        assert_eq!(alerts.record(&Outcome::Good), AlertDecision::Reset);
        assert_eq!(alerts.streak(), 0);
        assert_eq!(alerts.record(&BAD), AlertDecision::Counting(1));
    }

    #[test]
    fn mixed_reasons_share_a_streak() {
        let mut alerts = AlertController::new(3);
        alerts.record(&Outcome::Bad(BadReason::Slouching));
        alerts.record(&Outcome::Bad(BadReason::Tilting));
        assert_eq!(
            alerts.record(&Outcome::Bad(BadReason::PhoneDetected)),
            AlertDecision::Fire
        );
    }

    #[test]
    fn zero_limit_is_clamped() {
        let mut alerts = AlertController::new(0);
        assert_eq!(alerts.limit(), 1);
        assert_eq!(alerts.record(&BAD), AlertDecision::Fire);
    }
}
