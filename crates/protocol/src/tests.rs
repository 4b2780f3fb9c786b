use pretty_assertions::assert_eq;

use super::*;

#[test]
fn define_names_strip_values() {
	let mut part = ProjectPart::new("core");
	part.defines = vec!["DEBUG".into(), "LEVEL=3".into(), "EMPTY=".into()];

	let names: Vec<_> = part.define_names().collect();
	assert_eq!(names, ["DEBUG", "LEVEL", "EMPTY"]);
}

#[test]
fn project_part_lists_default_when_missing() {
	let part: ProjectPart = serde_json::from_str(r#"{"id":"core"}"#).unwrap();
	assert_eq!(part, ProjectPart::new("core"));
}

#[test]
fn register_content_is_optional() {
	let msg: Inbound = serde_json::from_str(r#"{"RegisterTranslationUnit":{"path":"/src/a.c","project_part":"core"}}"#).unwrap();
	assert_eq!(
		msg,
		Inbound::RegisterTranslationUnit {
			path: "/src/a.c".into(),
			project_part: ProjectPartId::new("core"),
			content: None,
		}
	);
}

#[test]
fn unit_variants_encode_as_bare_strings() {
	assert_eq!(serde_json::to_string(&Outbound::Alive).unwrap(), r#""Alive""#);
	let end: Inbound = serde_json::from_str(r#""End""#).unwrap();
	assert_eq!(end, Inbound::End);
}

#[test]
fn ticket_is_reported_for_answers_only() {
	let failed = Outbound::RequestFailed {
		ticket: Ticket(7),
		reason: "no such document".into(),
	};
	assert_eq!(failed.ticket(), Some(Ticket(7)));
	assert_eq!(Outbound::Alive.ticket(), None);
	assert_eq!(Outbound::Echo { message: "hi".into() }.ticket(), None);
}

#[test]
fn locations_order_by_line_then_column() {
	let mut locations = vec![SourceLocation::new(2, 1), SourceLocation::new(1, 9), SourceLocation::new(1, 3)];
	locations.sort();
	assert_eq!(locations, [SourceLocation::new(1, 3), SourceLocation::new(1, 9), SourceLocation::new(2, 1)]);
	assert_eq!(SourceLocation::new(4, 2).to_string(), "4:2");
}
