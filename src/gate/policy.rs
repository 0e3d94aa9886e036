use crate::verdict::{Draft, Verdict, VerdictLevel};

/// What the gate does with a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Let the original action through, rewriting the draft first if the
    /// service supplied a different text.
    Allow { correction: Option<String> },
    /// Keep the action from reaching the host site.
    Withhold { level: VerdictLevel },
}

/// Only `Safe` lets content through; `Caution` withholds just like `Block`
/// and differs only in the message shown.
pub fn decide(verdict: &Verdict, draft: &Draft) -> Decision {
    match verdict.level {
        VerdictLevel::Safe => Decision::Allow {
            correction: verdict
                .corrected_text
                .as_ref()
                .filter(|text| text.as_str() != draft.text())
                .cloned(),
        },
        level @ (VerdictLevel::Caution | VerdictLevel::Block) => Decision::Withhold { level },
    }
}
