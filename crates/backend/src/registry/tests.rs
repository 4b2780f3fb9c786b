use std::path::{Path, PathBuf};

use codemodel_protocol::ProjectPart;
use pretty_assertions::assert_eq;

use super::*;
use crate::engine::{LexicalEngine, ParseEngine, ParseInput};

fn doc_path() -> PathBuf {
	PathBuf::from("/src/main.c")
}

fn core() -> ProjectPartId {
	ProjectPartId::new("core")
}

fn registry_with_part() -> Registry {
	let mut registry = Registry::new();
	registry.create_or_update_project_parts([ProjectPart::new("core")]);
	registry
}

fn parse_outcome(registry: &Registry, path: &Path, role: UnitRole) -> ParseOutcome {
	let versions = registry.versions(path, role).unwrap();
	let part = registry.project_part(&core()).unwrap().clone();
	let unsaved = registry.unsaved_files();
	let handle = LexicalEngine
		.parse(&ParseInput {
			path,
			project_part: &part.part,
			unsaved: &unsaved,
		})
		.unwrap();
	ParseOutcome { handle, versions }
}

#[test]
fn create_document_requires_known_project_part() {
	let mut registry = Registry::new();
	let err = registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap_err();
	assert_eq!(err, RegistryError::UnknownProjectPartReferenced(core()));
}

#[test]
fn create_document_twice_fails() {
	let mut registry = registry_with_part();
	registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap();

	let err = registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap_err();
	assert_eq!(
		err,
		RegistryError::DocumentAlreadyExists {
			path: doc_path(),
			role: UnitRole::Main,
		}
	);
	assert_eq!(registry.document(&doc_path(), UnitRole::Main).unwrap().revision(), 1);
}

#[test]
fn supportive_unit_needs_open_document() {
	let mut registry = registry_with_part();
	let err = registry.create_document(&doc_path(), UnitRole::Supportive, &core()).unwrap_err();
	assert!(matches!(err, RegistryError::DocumentDoesNotExist { .. }));

	let main = registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap().id();
	let supportive = registry.create_document(&doc_path(), UnitRole::Supportive, &core()).unwrap().id();
	assert_ne!(main, supportive);
	assert!(registry.document(&doc_path(), UnitRole::Supportive).is_ok());

	registry.close_document(&doc_path()).unwrap();
	registry.remove_document(&doc_path(), UnitRole::Supportive).unwrap();
	assert!(registry.create_document(&doc_path(), UnitRole::Supportive, &core()).is_err());
}

#[test]
fn lookup_of_missing_role_fails() {
	let mut registry = registry_with_part();
	registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap();

	let err = registry.document(&doc_path(), UnitRole::Supportive).unwrap_err();
	assert_eq!(
		err,
		RegistryError::DocumentDoesNotExist {
			path: doc_path(),
			role: UnitRole::Supportive,
		}
	);
}

#[test]
fn pinned_document_cannot_be_removed() {
	let mut registry = registry_with_part();
	let pin = registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap().pin();

	let err = registry.remove_document(&doc_path(), UnitRole::Main).unwrap_err();
	assert_eq!(err, RegistryError::DocumentPinned { path: doc_path(), pins: 1 });
	assert_eq!(registry.document_count(), 1);

	drop(pin);
	registry.remove_document(&doc_path(), UnitRole::Main).unwrap();
	assert_eq!(registry.document_count(), 0);
}

#[test]
fn removing_main_checks_supportive_pins() {
	let mut registry = registry_with_part();
	registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap();
	let pins = {
		let unit = registry.create_document(&doc_path(), UnitRole::Supportive, &core()).unwrap();
		(unit.pin(), unit.pin())
	};

	let err = registry.remove_document(&doc_path(), UnitRole::Main).unwrap_err();
	assert_eq!(err, RegistryError::DocumentPinned { path: doc_path(), pins: 2 });

	drop(pins);
	registry.remove_document(&doc_path(), UnitRole::Main).unwrap();
}

#[test]
fn unsaved_edits_bump_revision_of_registered_document() {
	let mut registry = registry_with_part();
	registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap();

	let v1 = registry.update_unsaved_file(doc_path(), "int a;");
	let v2 = registry.update_unsaved_file(PathBuf::from("/src/other.h"), "int b;");
	assert!(v2 > v1);
	assert_eq!(registry.document(&doc_path(), UnitRole::Main).unwrap().revision(), 2);

	assert_eq!(registry.remove_unsaved_file(Path::new("/src/never.c")), None);
	let v3 = registry.remove_unsaved_file(&doc_path()).unwrap();
	assert!(v3 > v2);
	assert_eq!(registry.document(&doc_path(), UnitRole::Main).unwrap().revision(), 3);
	assert!(registry.unsaved_files().get(&doc_path()).is_none());
}

#[test]
fn unsaved_snapshots_are_immutable() {
	let mut registry = registry_with_part();
	registry.update_unsaved_file(doc_path(), "old");
	let before = registry.unsaved_files();

	registry.update_unsaved_file(doc_path(), "new");

	assert_eq!(before.get(&doc_path()).map(|c| &**c), Some("old"));
	assert_eq!(registry.unsaved_files().get(&doc_path()).map(|c| &**c), Some("new"));
	assert_eq!(registry.unsaved_files().version(), before.version() + 1);
}

#[test]
fn suspend_releases_handle_and_keeps_identity() {
	let mut registry = registry_with_part();
	registry.update_unsaved_file(doc_path(), "int x;");
	let unit = registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap().clone();

	assert!(unit.install(parse_outcome(&registry, &doc_path(), UnitRole::Main)));
	assert_eq!(unit.generation(), 1);
	assert_eq!(unit.parsed_revision(), Some(1));

	assert!(registry.set_is_suspended(&doc_path(), UnitRole::Main, true).unwrap());
	assert!(!registry.set_is_suspended(&doc_path(), UnitRole::Main, true).unwrap());
	assert!(unit.is_suspended());
	assert!(!unit.has_handle());
	assert_eq!(unit.parsed_revision(), None);
	assert!(
		!unit.install(parse_outcome(&registry, &doc_path(), UnitRole::Main)),
		"suspended units accept no parse"
	);

	assert!(registry.set_is_suspended(&doc_path(), UnitRole::Main, false).unwrap());
	assert!(!registry.document(&doc_path(), UnitRole::Main).unwrap().is_suspended());
	assert!(unit.install(parse_outcome(&registry, &doc_path(), UnitRole::Main)));
	assert_eq!(unit.generation(), 2);
	assert_eq!(registry.document(&doc_path(), UnitRole::Main).unwrap().main().id(), unit.id());
}

#[test]
fn install_keeps_newest_parse() {
	let mut registry = registry_with_part();
	registry.update_unsaved_file(doc_path(), "int x;");
	let unit = registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap().clone();
	let old = parse_outcome(&registry, &doc_path(), UnitRole::Main);

	registry.update_unsaved_file(doc_path(), "int y;");
	let new = parse_outcome(&registry, &doc_path(), UnitRole::Main);

	assert!(unit.install(new));
	assert!(!unit.install(old));
	assert_eq!(unit.parsed_revision(), Some(2));
	assert_eq!(unit.generation(), 1);
}

#[test]
fn freshest_handle_falls_back_to_supportive() {
	let mut registry = registry_with_part();
	registry.update_unsaved_file(doc_path(), "int x;");
	let main = registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap().clone();
	let supportive = registry
		.create_document(&doc_path(), UnitRole::Supportive, &core())
		.unwrap()
		.clone();
	let versions = registry.versions(&doc_path(), UnitRole::Main).unwrap();
	assert!(registry.freshest_handle(&doc_path(), &versions).is_none());

	supportive.install(parse_outcome(&registry, &doc_path(), UnitRole::Supportive));
	assert!(matches!(registry.freshest_handle(&doc_path(), &versions), Some((UnitRole::Supportive, _))));

	main.install(parse_outcome(&registry, &doc_path(), UnitRole::Main));
	assert!(matches!(registry.freshest_handle(&doc_path(), &versions), Some((UnitRole::Main, _))));

	registry.update_unsaved_file(doc_path(), "int z;");
	let versions = registry.versions(&doc_path(), UnitRole::Main).unwrap();
	assert!(registry.freshest_handle(&doc_path(), &versions).is_none());
}

#[test]
fn project_part_versions_never_repeat() {
	let mut registry = registry_with_part();
	let first = registry.project_part(&core()).unwrap().version;

	registry.create_or_update_project_parts([ProjectPart::new("core")]);
	let second = registry.project_part(&core()).unwrap().version;
	assert!(second > first);

	assert_eq!(registry.remove_project_parts([&core(), &ProjectPartId::new("other")]), 1);
	assert!(registry.project_part(&core()).is_err());

	registry.create_or_update_project_parts([ProjectPart::new("core")]);
	assert!(registry.project_part(&core()).unwrap().version > second);
	assert_eq!(registry.project_part_count(), 1);
}

#[test]
fn closed_document_stays_until_removed() {
	let mut registry = registry_with_part();
	registry.create_document(&doc_path(), UnitRole::Main, &core()).unwrap();
	registry.close_document(&doc_path()).unwrap();

	let document = registry.document(&doc_path(), UnitRole::Main).unwrap();
	assert!(document.is_closed());
	assert!(registry.close_document(Path::new("/src/unknown.c")).is_err());
}
