use crate::fault::Fault;
use crate::format::{format_parts, strip_ansi};
use crate::message::{MessagePart, MessageValue};
use crate::reconstruct::{default_cloner, FaultCloner};

/// Message used when the input carries nothing reportable.
pub const UNSPECIFIED_ERROR: &str = "Unspecified error";

/// Turn a loosely shaped message into exactly one fault.
///
/// **Rules**
/// - absent input, empty text, or an empty sequence yields
///   `Error("Unspecified error")`;
/// - text yields `Error(text)`;
/// - a fault is cloned, never modified in place;
/// - a sequence is split into its first fault (if any) and the printf-style
///   join of every non-fault part. With a fault, the joined text is
///   prepended to a clone's message; without one, the joined text becomes
///   a new `Error`.
///
/// ANSI colour sequences are stripped from the resulting message, and a
/// message left empty after that is replaced with `"Unspecified error"`.
#[track_caller]
pub fn normalize(input: Option<&MessageValue>) -> Fault {
    normalize_with(default_cloner(), input)
}

/// [`normalize`] using a caller-supplied reconstruction registry.
#[track_caller]
pub fn normalize_with(cloner: &FaultCloner, input: Option<&MessageValue>) -> Fault {
    let mut fault = match input {
        None => Fault::new(UNSPECIFIED_ERROR),
        Some(MessageValue::Text(text)) if text.is_empty() => Fault::new(UNSPECIFIED_ERROR),
        Some(MessageValue::Text(text)) => Fault::new(text.as_str()),
        Some(MessageValue::Fault(source)) => cloner.clone_fault(source),
        Some(MessageValue::Sequence(parts)) => from_sequence(cloner, parts),
    };

    let cleaned = strip_ansi(fault.message()).into_owned();
    if cleaned.is_empty() {
        fault.set_message(UNSPECIFIED_ERROR);
    } else {
        fault.set_message(cleaned);
    }
    fault
}

#[track_caller]
fn from_sequence(cloner: &FaultCloner, parts: &[MessagePart]) -> Fault {
    let text = format_parts(parts.iter().filter(|part| !matches!(part, MessagePart::Fault(_))));
    let first_fault = parts.iter().find_map(|part| match part {
        MessagePart::Fault(fault) => Some(fault),
        _ => None,
    });

    match first_fault {
        Some(source) => {
            let mut fault = cloner.clone_fault(source);
            if !text.is_empty() {
                let message = format!("{} {}", text, fault.message());
                fault.set_message(message);
            }
            fault
        }
        None if text.is_empty() => Fault::new(UNSPECIFIED_ERROR),
        None => Fault::new(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message;

    #[test]
    fn absent_and_empty_inputs_degrade() {
        assert_eq!(normalize(None).message(), UNSPECIFIED_ERROR);
        assert_eq!(normalize(Some(&MessageValue::from(""))).message(), UNSPECIFIED_ERROR);
        assert_eq!(normalize(Some(&MessageValue::Sequence(vec![]))).message(), UNSPECIFIED_ERROR);
        assert_eq!(normalize(Some(&message![""])).message(), UNSPECIFIED_ERROR);
        assert_eq!(normalize(Some(&message!["\x1b[31m\x1b[39m"])).message(), UNSPECIFIED_ERROR);
    }

    #[test]
    fn empty_parts_still_join_with_a_space() {
        assert_eq!(normalize(Some(&message!["", ""])).message(), " ");
    }

    #[test]
    fn plain_text_becomes_error() {
        let fault = normalize(Some(&MessageValue::from("A string message only")));
        assert_eq!(fault.kind(), "Error");
        assert_eq!(fault.message(), "A string message only");
        assert!(!fault.stack().is_empty());
    }

    #[test]
    fn sequence_of_text_is_joined() {
        let fault = normalize(Some(&message!["First string", "Second string"]));
        assert_eq!(fault.message(), "First string Second string");
    }

    #[test]
    fn sequence_with_fault_keeps_its_backtrace() {
        let source = Fault::new("Test error object");
        let input = message!["A string containing %s and a", "an embedded string", source.clone()];
        let fault = normalize(Some(&input));
        assert_eq!(fault.message(), "A string containing an embedded string and a Test error object");
        assert_eq!(fault.stack(), source.stack());
    }

    #[test]
    fn lone_fault_in_sequence_keeps_message() {
        let fault = normalize(Some(&message![Fault::with_kind("TypeError", "bad type")]));
        assert_eq!(fault.kind(), "TypeError");
        assert_eq!(fault.message(), "bad type");
    }

    #[test]
    fn colours_are_stripped_without_touching_the_source() {
        let coloured = "\x1b[31mExample error text with ANSI colours\x1b[39m";
        let source = Fault::new(coloured);
        let input = MessageValue::from(source.clone());

        let fault = normalize(Some(&input));
        assert_eq!(fault.message(), "Example error text with ANSI colours");
        assert_eq!(input.as_fault().map(Fault::message), Some(coloured));

        let fault = normalize(Some(&message!["Some preceding text", source.clone()]));
        assert_eq!(fault.message(), "Some preceding text Example error text with ANSI colours");
        assert_eq!(source.message(), coloured);
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let once = normalize(Some(&message!["prefix", Fault::new("\x1b[1mbold\x1b[0m")]));
        let twice = normalize(Some(&MessageValue::from(once.clone())));
        assert_eq!(once.message(), twice.message());
        assert_eq!(once.stack(), twice.stack());
    }
}
