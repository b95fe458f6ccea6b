use hintline_catalog::{Catalog, PuzzleKey};
use hintline_llm::{CompletionProvider, CompletionRequest};
use serde::Deserialize;

use crate::state::Exchange;

/// What the model said about one turn. `puzzle` is the match contract —
/// `None` covers provider failure, unparseable replies, and explicit
/// general-chat verdicts alike. `chat_response` is the model's optional
/// conversational reply, used verbatim for turns that reveal nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReply {
    pub puzzle: Option<PuzzleKey>,
    pub chat_response: Option<String>,
}

impl MatchReply {
    fn no_match() -> Self {
        Self::default()
    }
}

#[derive(Debug, Deserialize)]
struct ModelVerdict {
    #[serde(default)]
    puzzle_match: Option<bool>,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    puzzle_name: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

/// Asks the model to map free text onto one catalog pair. Single attempt;
/// every failure mode collapses to a no-match reply and a warn log. The
/// returned key is NOT yet validated against the catalog — the engine does
/// that before the tracker ever sees it.
pub async fn match_puzzle(
    provider: &dyn CompletionProvider,
    catalog: &Catalog,
    user_text: &str,
    history: &[Exchange],
    persona: Option<&str>,
) -> MatchReply {
    let mut request = CompletionRequest::new(build_prompt(catalog, user_text, history));
    if let Some(persona) = persona
        && !persona.trim().is_empty()
    {
        request = request.with_preamble(persona);
    }

    let reply_text = match provider.complete(request).await {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(error = %error, "puzzle match call failed; treating as no match");
            return MatchReply::no_match();
        }
    };

    parse_reply(&reply_text)
}

fn build_prompt(catalog: &Catalog, user_text: &str, history: &[Exchange]) -> String {
    let puzzle_list = catalog
        .keys()
        .map(|key| format!("Room: {}, Puzzle: {}", key.room, key.puzzle_name))
        .collect::<Vec<_>>()
        .join("\n");

    let history_block = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .map(|exchange| format!("User: {}\nAssistant: {}", exchange.user, exchange.assistant))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a helpful escape room assistant.\n\
         \n\
         Available puzzles:\n\
         {puzzle_list}\n\
         \n\
         Recent conversation:\n\
         {history_block}\n\
         \n\
         User message: \"{user_text}\"\n\
         \n\
         If the user is asking about a specific puzzle from the list, return ONLY a JSON object:\n\
         {{\"puzzle_match\": true, \"room\": \"exact room name\", \"puzzle_name\": \"exact puzzle name\", \"response\": \"short conversational reply\"}}\n\
         If this is general chat, return ONLY:\n\
         {{\"puzzle_match\": false, \"response\": \"short conversational reply\"}}\n\
         Use the exact room and puzzle_name text as they appear in the list."
    )
}

fn parse_reply(reply: &str) -> MatchReply {
    let Some(json_text) = extract_json_object(reply) else {
        tracing::warn!(reply_length = reply.len(), "no JSON object in model reply");
        return MatchReply::no_match();
    };

    let verdict = match serde_json::from_str::<ModelVerdict>(json_text) {
        Ok(verdict) => verdict,
        Err(error) => {
            tracing::warn!(error = %error, "model reply JSON did not parse");
            return MatchReply::no_match();
        }
    };

    let chat_response = verdict.response.filter(|response| !response.trim().is_empty());

    if verdict.puzzle_match == Some(false) {
        return MatchReply {
            puzzle: None,
            chat_response,
        };
    }

    let puzzle = match (verdict.room, verdict.puzzle_name) {
        (Some(room), Some(puzzle_name))
            if !room.trim().is_empty() && !puzzle_name.trim().is_empty() =>
        {
            Some(PuzzleKey::new(room.trim(), puzzle_name.trim()))
        }
        _ => None,
    };

    MatchReply {
        puzzle,
        chat_response,
    }
}

/// First balanced `{...}` block, string-aware. Models wrap JSON in prose and
/// code fences often enough that plain find-first/find-last is not safe.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, character) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if character == '\\' {
                escaped = true;
            } else if character == '"' {
                in_string = false;
            }
            continue;
        }

        match character {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + character.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use hintline_catalog::PuzzleRecord;

    fn two_puzzle_catalog() -> Catalog {
        Catalog::from_records(vec![
            PuzzleRecord::new(
                PuzzleKey::new("Room 2", "Mushroom Lock"),
                None,
                vec!["Look under the moss".to_string()],
            ),
            PuzzleRecord::new(
                PuzzleKey::new("Room 1", "Star Chart"),
                None,
                vec!["Find Orion".to_string()],
            ),
        ])
        .expect("build catalog")
    }

    #[test]
    fn prompt_enumerates_every_pair_and_the_recent_history() {
        let catalog = two_puzzle_catalog();
        let history = vec![
            Exchange::new("hello", "Hi! Which puzzle are you on?"),
            Exchange::new("the mushrooms", "Here's hint 1 for Mushroom Lock: ..."),
        ];

        let prompt = build_prompt(&catalog, "another hint please", &history);
        assert!(prompt.contains("Room: Room 2, Puzzle: Mushroom Lock"));
        assert!(prompt.contains("Room: Room 1, Puzzle: Star Chart"));
        assert!(prompt.contains("User: the mushrooms"));
        assert!(prompt.contains("User message: \"another hint please\""));
    }

    #[test]
    fn reply_wrapped_in_prose_and_fences_still_parses() {
        let reply = "Sure! Here you go:\n```json\n{\"puzzle_match\": true, \"room\": \"Room 2\", \
                     \"puzzle_name\": \"Mushroom Lock\", \"response\": \"On it!\"}\n```\nanything else?";

        let parsed = parse_reply(reply);
        assert_eq!(parsed.puzzle, Some(PuzzleKey::new("Room 2", "Mushroom Lock")));
        assert_eq!(parsed.chat_response.as_deref(), Some("On it!"));
    }

    #[test]
    fn braces_inside_json_strings_do_not_truncate_extraction() {
        let reply = "{\"puzzle_match\": true, \"room\": \"Room {2}\", \"puzzle_name\": \"Lock\", \
                     \"response\": \"ok\"}";

        let parsed = parse_reply(reply);
        assert_eq!(parsed.puzzle, Some(PuzzleKey::new("Room {2}", "Lock")));
    }

    #[test]
    fn general_chat_verdict_keeps_the_response_but_no_puzzle() {
        let reply = "{\"puzzle_match\": false, \"response\": \"Good luck in there!\"}";

        let parsed = parse_reply(reply);
        assert_eq!(parsed.puzzle, None);
        assert_eq!(parsed.chat_response.as_deref(), Some("Good luck in there!"));
    }

    #[test]
    fn missing_either_key_field_is_no_match() {
        let parsed = parse_reply("{\"room\": \"Room 2\"}");
        assert_eq!(parsed.puzzle, None);

        let parsed = parse_reply("{\"puzzle_name\": \"Mushroom Lock\"}");
        assert_eq!(parsed.puzzle, None);
    }

    #[test]
    fn unparseable_replies_are_no_match() {
        assert_eq!(parse_reply("I have no idea what you mean."), MatchReply::no_match());
        assert_eq!(parse_reply("{not json at all"), MatchReply::no_match());
        assert_eq!(parse_reply(""), MatchReply::no_match());
    }

    #[test]
    fn verdict_without_the_flag_falls_back_to_the_key_fields() {
        // escape_ai-era replies carry only the two fields.
        let parsed = parse_reply("{\"room\": \"Room 1\", \"puzzle_name\": \"Star Chart\"}");
        assert_eq!(parsed.puzzle, Some(PuzzleKey::new("Room 1", "Star Chart")));
        assert_eq!(parsed.chat_response, None);
    }
}
