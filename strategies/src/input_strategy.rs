use std::io::{self, Write};

use itertools::Itertools;
use regex::Regex;
use types::{GameState, PlayerId, Prompt, Strategy};

/// Lets a person at the terminal act as moderator. Seats are typed 1-based
/// (`3` or `p3`); optional prompts accept `skip`.
#[derive(Debug, Default)]
pub struct InputStrategy {}

impl Strategy for InputStrategy {
    fn select_target(
        &mut self,
        prompt: Prompt,
        state: &GameState,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        println!("{state}");
        println!(
            "{prompt}: [ {} ]",
            candidates.iter().map(|id| id + 1).join(", ")
        );

        if candidates.is_empty() {
            log::info!("No candidates for {prompt}");
            return None;
        }
        // if only one candidate on a mandatory prompt, take it
        if candidates.len() == 1 && !prompt.is_optional() {
            return candidates.first().copied();
        }

        let mut buf = String::new();
        loop {
            match select_from_stdin(&mut buf, prompt, candidates) {
                Ok(choice) => return choice,
                Err(err) => {
                    buf.clear();
                    log::error!("Error parsing message from stdin: {err}")
                }
            }
        }
    }
}

fn select_from_stdin(
    buf: &mut String,
    prompt: Prompt,
    candidates: &[PlayerId],
) -> Result<Option<PlayerId>, String> {
    print!("Your choice? >> ");
    let _ = io::stdout().flush();
    match io::stdin().read_line(buf) {
        Ok(_) => select_from_str(buf, prompt, candidates),
        Err(err) => {
            buf.clear();
            Err(format!("Error reading line from stdin: {err}"))
        }
    }
}

fn select_from_str(
    input: &str,
    prompt: Prompt,
    candidates: &[PlayerId],
) -> Result<Option<PlayerId>, String> {
    let input = input.trim().to_lowercase();

    let skip_re = Regex::new(r"^(skip|none|-)$").expect("Valid skip regex");
    if skip_re.is_match(&input) {
        return if prompt.is_optional() {
            Ok(None)
        } else {
            Err(format!("{prompt} cannot be skipped"))
        };
    }

    let seat_re = Regex::new(r"^(?:p|card\s*)?(?<seat>\d+)$").expect("Valid seat regex");
    let Some(caps) = seat_re.captures(&input) else {
        return Err(format!("Unable to parse a seat from string: {input}"));
    };
    let seat: usize = caps["seat"]
        .parse()
        .map_err(|err| format!("Bad seat number: {err}"))?;
    let choice = seat
        .checked_sub(1)
        .ok_or_else(|| "Seats start at 1".to_string())?;

    if candidates.contains(&choice) {
        Ok(Some(choice))
    } else {
        Err(format!("{seat} is not a permitted choice for {prompt}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_seats() {
        let prompt = Prompt::DoctorProtect;
        assert_eq!(select_from_str("3\n", prompt, &[0, 2]), Ok(Some(2)));
        assert_eq!(select_from_str(" P1 ", prompt, &[0, 2]), Ok(Some(0)));
        assert!(select_from_str("2", prompt, &[0, 2]).is_err());
        assert!(select_from_str("0", prompt, &[0, 2]).is_err());
        assert!(select_from_str("doctor", prompt, &[0, 2]).is_err());
    }

    #[test]
    fn test_skip_only_for_optional_prompts() {
        assert_eq!(
            select_from_str("skip", Prompt::VigilantePurge, &[1]),
            Ok(None)
        );
        assert!(select_from_str("skip", Prompt::MafiaAttack, &[1]).is_err());
    }

    #[test]
    fn test_card_picks() {
        let prompt = Prompt::DealPick { player: 0 };
        assert_eq!(select_from_str("card 4", prompt, &[3, 5]), Ok(Some(3)));
    }
}
