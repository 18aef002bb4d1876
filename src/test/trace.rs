use mongodb::bson::doc;
use pretty_assertions::assert_eq;

use crate::trace::{
    default_filter,
    truncate_on_char_boundary,
    TracingRepresentation,
    COMMAND_TRACING_EVENT_TARGET,
};

#[test]
fn tracing_truncation() {
    let two_emoji = String::from("🤔🤔");

    let mut s = two_emoji.clone();
    assert_eq!(s.len(), 8);

    // start of string is a boundary, so we should truncate there
    truncate_on_char_boundary(&mut s, 0);
    assert_eq!(s, String::from("..."));

    // we should "round up" to the end of the first emoji
    s.clone_from(&two_emoji);
    truncate_on_char_boundary(&mut s, 1);
    assert_eq!(s, String::from("🤔..."));

    // 4 is a boundary, so we should truncate there
    s.clone_from(&two_emoji);
    truncate_on_char_boundary(&mut s, 4);
    assert_eq!(s, String::from("🤔..."));

    // rounding up reaches the end of the string, so nothing is cut
    s.clone_from(&two_emoji);
    truncate_on_char_boundary(&mut s, 5);
    assert_eq!(s, two_emoji);

    // exactly as long as the limit
    s.clone_from(&two_emoji);
    truncate_on_char_boundary(&mut s, 8);
    assert_eq!(s, two_emoji);

    // already shorter than the limit
    s.clone_from(&two_emoji);
    truncate_on_char_boundary(&mut s, 10);
    assert_eq!(s, two_emoji);
}

#[test]
fn documents_render_as_relaxed_extended_json() {
    let command = doc! { "aggregate": "ArchiveEntry" };
    assert_eq!(
        command.tracing_representation(1000),
        r#"{"aggregate":"ArchiveEntry"}"#
    );
    assert_eq!(command.tracing_representation(12), r#"{"aggregate"..."#);

    let reply = doc! { "n": 5_000_000_000_i64 };
    assert_eq!(reply.tracing_representation(1000), r#"{"n":5000000000}"#);
}

#[test]
fn verbose_filter_enables_command_target() {
    assert!(default_filter(true).contains(&format!("{COMMAND_TRACING_EVENT_TARGET}=debug")));
    assert!(!default_filter(false).contains(COMMAND_TRACING_EVENT_TARGET));
}
