/// How an article's text came to be, as four percentages that must
/// account for the whole piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiAttribution {
    ai_generated: i16,
    ai_generated_ai_refined: i16,
    human_written_ai_refined: i16,
    human_written: i16,
}

impl AiAttribution {
    pub fn parse(
        ai_generated: i16,
        ai_generated_ai_refined: i16,
        human_written_ai_refined: i16,
        human_written: i16,
    ) -> Result<Self, String> {
        let shares = [
            ai_generated,
            ai_generated_ai_refined,
            human_written_ai_refined,
            human_written,
        ];
        if shares.iter().any(|share| !(0..=100).contains(share)) {
            return Err("Each attribution share must be between 0 and 100.".to_string());
        }
        let total: i16 = shares.iter().sum();
        if total != 100 {
            return Err(format!(
                "Attribution shares must add up to 100, got {total}."
            ));
        }
        Ok(Self {
            ai_generated,
            ai_generated_ai_refined,
            human_written_ai_refined,
            human_written,
        })
    }

    pub fn fully_human() -> Self {
        Self {
            ai_generated: 0,
            ai_generated_ai_refined: 0,
            human_written_ai_refined: 0,
            human_written: 100,
        }
    }

    pub fn ai_generated(&self) -> i16 {
        self.ai_generated
    }

    pub fn ai_generated_ai_refined(&self) -> i16 {
        self.ai_generated_ai_refined
    }

    pub fn human_written_ai_refined(&self) -> i16 {
        self.human_written_ai_refined
    }

    pub fn human_written(&self) -> i16 {
        self.human_written
    }
}
