//! Interactive decision source.
//!
//! Core logic never talks to the terminal directly; it asks a [`Decider`]
//! for selections and confirmations, so orchestration stays testable and
//! headless runs can plug in a scripted source.

use dialoguer::{Confirm, Select, theme::ColorfulTheme};

#[derive(Debug, Clone)]
pub struct Candidate {
    pub label: String,
    pub detail: String,
}

pub trait Decider {
    /// Pick one of the options, or `None` to cancel.
    fn select(&self, prompt: &str, options: &[Candidate]) -> Option<usize>;
    /// Yes/no question; interrupts and read errors count as "no".
    fn confirm(&self, prompt: &str) -> bool;
}

/// Resolve a choice, only consulting the decider when there is a real
/// decision to make: no options cancels, a single option is taken as-is.
pub fn choose(decider: &dyn Decider, prompt: &str, options: &[Candidate]) -> Option<usize> {
    match options.len() {
        0 => None,
        1 => Some(0),
        _ => decider.select(prompt, options),
    }
}

/// Terminal-backed decider using dialoguer.
pub struct TerminalDecider;

impl Decider for TerminalDecider {
    fn select(&self, prompt: &str, options: &[Candidate]) -> Option<usize> {
        let items: Vec<String> = options
            .iter()
            .map(|c| {
                if c.detail.is_empty() {
                    c.label.clone()
                } else {
                    format!("{}  ({})", c.label, c.detail)
                }
            })
            .collect();
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&items)
            .default(0)
            .interact_opt()
            .ok()
            .flatten()
    }

    fn confirm(&self, prompt: &str) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedDecider;
    use super::*;

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate {
                label: format!("option-{i}"),
                detail: String::new(),
            })
            .collect()
    }

    #[test]
    fn zero_options_cancel_without_asking() {
        let decider = ScriptedDecider::declining();
        assert_eq!(choose(&decider, "pick", &candidates(0)), None);
    }

    #[test]
    fn single_option_skips_the_decider() {
        // A declining decider would return None if it were consulted
        let decider = ScriptedDecider::declining();
        assert_eq!(choose(&decider, "pick", &candidates(1)), Some(0));
    }

    #[test]
    fn multiple_options_consult_the_decider() {
        let decider = ScriptedDecider::new([Some(2)], []);
        assert_eq!(choose(&decider, "pick", &candidates(3)), Some(2));
    }

    #[test]
    fn cancelled_selection_propagates() {
        let decider = ScriptedDecider::new([None], []);
        assert_eq!(choose(&decider, "pick", &candidates(3)), None);
    }
}
