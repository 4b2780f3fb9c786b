use std::path::Path;

use codemodel_protocol::ProjectPart;
use pretty_assertions::assert_eq;

use super::*;
use crate::registry::Registry;

const SUM: &str = "int total;
int add(int a, int b) {
	int sum = a + b;
	total = sum;
	return sum;
}
";

fn parse_with(source: &str, part: &ProjectPart) -> ParsedHandle {
	let path = Path::new("/src/main.c");
	let mut registry = Registry::new();
	registry.update_unsaved_file(path.to_path_buf(), source);
	let unsaved = registry.unsaved_files();
	LexicalEngine
		.parse(&ParseInput {
			path,
			project_part: part,
			unsaved: &unsaved,
		})
		.unwrap()
}

fn parse(source: &str) -> ParsedHandle {
	parse_with(source, &ProjectPart::new("core"))
}

fn at(line: u32, column: u32) -> SourceLocation {
	SourceLocation::new(line, column)
}

fn messages(unit: &ParsedHandle) -> Vec<(SourceLocation, String)> {
	unit.diagnostics().into_iter().map(|d| (d.location, d.text)).collect()
}

#[test]
fn missing_semicolon_is_reported_after_declaration() {
	let unit = parse("int x");
	assert_eq!(
		unit.diagnostics(),
		vec![Diagnostic {
			severity: Severity::Error,
			location: at(1, 6),
			text: "expected ';' after declaration".into(),
		}]
	);
}

#[test]
fn complete_sources_have_no_diagnostics() {
	assert!(parse("int x;\n").diagnostics().is_empty());
	assert!(parse(SUM).diagnostics().is_empty());
}

#[test]
fn unbalanced_brackets_are_reported() {
	assert_eq!(messages(&parse("void f() {\n")), [(at(1, 10), "unmatched '{'".to_string())]);
	assert_eq!(messages(&parse("int y; }")), [(at(1, 8), "unexpected '}'".to_string())]);
}

#[test]
fn unterminated_string_is_reported() {
	assert_eq!(
		messages(&parse("char *s = \"abc")),
		[
			(at(1, 11), "missing terminating \" character".to_string()),
			(at(1, 15), "expected ';' after declaration".to_string()),
		]
	);
}

#[test]
fn token_infos_classify_tokens() {
	let unit = parse("#define LIMIT 4\nint n = LIMIT; // c");
	let infos: Vec<_> = unit
		.token_infos()
		.into_iter()
		.map(|info| (info.location.line, info.location.column, info.length, info.kind))
		.collect();

	assert_eq!(
		infos,
		[
			(1, 1, 15, TokenKind::Preprocessor),
			(2, 1, 3, TokenKind::Keyword),
			(2, 5, 1, TokenKind::Identifier),
			(2, 7, 1, TokenKind::Punctuation),
			(2, 9, 5, TokenKind::Macro),
			(2, 14, 1, TokenKind::Punctuation),
			(2, 16, 4, TokenKind::Comment),
		]
	);
}

#[test]
fn project_part_defines_are_macros() {
	let mut part = ProjectPart::new("core");
	part.defines = vec!["DEBUG=1".into()];
	let unit = parse_with("int x = DEBUG;", &part);

	assert_eq!(unit.tool_tip(at(1, 9)).as_deref(), Some("macro DEBUG"));
}

#[test]
fn references_of_local_variable_stay_in_function() {
	let unit = parse(SUM);

	let sum = unit.references(at(3, 6));
	assert_eq!(sum.locations, [at(3, 6), at(4, 10), at(5, 9)]);
	assert!(sum.is_local_variable);

	let param = unit.references(at(2, 13));
	assert_eq!(param.locations, [at(2, 13), at(3, 12)]);
	assert!(param.is_local_variable);

	let total = unit.references(at(4, 2));
	assert_eq!(total.locations, [at(1, 5), at(4, 2)]);
	assert!(!total.is_local_variable);
}

#[test]
fn inner_declaration_shadows_outer() {
	let unit = parse("int v;\nvoid f() {\n\tint v;\n\tv = 1;\n}\nint g() { return v; }\n");

	assert_eq!(unit.references(at(4, 2)).locations, [at(3, 6), at(4, 2)]);
	let global = unit.references(at(1, 5));
	assert_eq!(global.locations, [at(1, 5), at(6, 18)]);
	assert!(!global.is_local_variable);
}

#[test]
fn tool_tip_shows_declaration() {
	let unit = parse(SUM);

	assert_eq!(unit.tool_tip(at(4, 10)).as_deref(), Some("int sum"));
	assert_eq!(unit.tool_tip(at(2, 5)).as_deref(), Some("int add"));
	assert_eq!(unit.tool_tip(at(1, 1)), None, "keywords have no tooltip");
	assert_eq!(unit.tool_tip(at(40, 1)), None);
}

#[test]
fn follow_symbol_jumps_to_declared_name() {
	let unit = parse(SUM);

	assert_eq!(
		unit.follow_symbol(at(5, 9)),
		Some(SourceRange {
			start: at(3, 6),
			end: at(3, 9),
		})
	);
	assert_eq!(unit.follow_symbol(at(5, 2)), None);
}

#[test]
fn reads_disk_when_no_unsaved_content() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("disk.c");
	std::fs::write(&path, "int y;").unwrap();
	let registry = Registry::new();
	let unsaved = registry.unsaved_files();
	let part = ProjectPart::new("core");
	let input = ParseInput {
		path: &path,
		project_part: &part,
		unsaved: &unsaved,
	};

	let unit = LexicalEngine.parse(&input).unwrap();
	assert_eq!(unit.token_infos().len(), 3);

	let missing = dir.path().join("missing.c");
	let input = ParseInput { path: &missing, ..input };
	assert!(matches!(LexicalEngine.parse(&input), Err(EngineError::Read { .. })));
}
