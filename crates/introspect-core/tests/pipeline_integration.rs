//! Discovery, parsing, caching and emission over real files on disk.

use std::fs;
use std::path::Path;

use introspect_core::{
    collect_headers, CodeGenerator, DiscoveryOptions, EmitFlags, ExtractorFilter, Pipeline,
    PipelineOptions, SymTableCache,
};
use pretty_assertions::assert_eq;
use regex::Regex;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_project(root: &Path) {
    write(
        root,
        "include/shapes.h",
        r#"
#pragma once
#include <string>

namespace geo {

ENUM_META
enum class Kind : unsigned char { Circle, Square = 0x2, Triangle };

CLASS_META(serializable)
class Shape {
public:
    virtual ~Shape();
    enum Internal { Hidden };
private:
    enum class Secret { A };
};

struct Circle final : public Shape { float radius = 1.0f; };

} // namespace geo
"#,
    );
    write(
        root,
        "include/detail/impl.hpp",
        r#"
namespace geo { class Shape; }
namespace { struct Local {}; }
template <typename T> struct Holder { enum Inner { X }; };
BEGIN_IGNORE_META_SECTION
enum Ignored { Y };
END_IGNORE_META_SECTION
"#,
    );
    write(root, "src/shapes.cpp", "enum NotAHeader { Z };");
    write(root, "build/generated.h", "enum Generated { G };");
}

fn discovery_options() -> DiscoveryOptions {
    DiscoveryOptions {
        exclude_patterns: vec!["build/**".to_string()],
        ..Default::default()
    }
}

#[test]
fn test_discovery_finds_headers_only() {
    let temp_dir = TempDir::new().unwrap();
    sample_project(temp_dir.path());

    let files = collect_headers(temp_dir.path(), &discovery_options()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["impl.hpp", "shapes.h"]);
}

#[test]
fn test_generate_to_directory() {
    let temp_dir = TempDir::new().unwrap();
    sample_project(temp_dir.path());
    let out_dir = temp_dir.path().join("out");

    let files = collect_headers(temp_dir.path(), &discovery_options()).unwrap();
    let pipeline = Pipeline::new(PipelineOptions::default());
    let report = pipeline.run(&files).unwrap();
    assert_eq!(report.diagnostic_count(), 0);

    let mut generator = CodeGenerator::to_directory(&out_dir, "metadata");
    let summary = pipeline.emit(&report, &mut generator).unwrap();

    // Kind and Shape::Internal; Secret is private, Inner lives in a template,
    // Ignored sits in an ignore section.
    assert_eq!(summary.enums, 2);
    // Shape and Circle; Local is unreachable by name, Holder is a template.
    assert_eq!(summary.classes, 2);
    assert_eq!(summary.includes, 1);

    let header = fs::read_to_string(out_dir.join("metadata.h")).unwrap();
    assert!(header.contains("struct EnumTrait<geo::Kind>"));
    assert!(header.contains("struct EnumTrait<geo::Shape::Internal>"));
    assert!(header.contains("struct ClassTrait<geo::Circle>"));
    assert!(!header.contains("Secret"));
    assert!(!header.contains("Ignored"));
    assert!(!header.contains("Holder"));

    let source = fs::read_to_string(out_dir.join("metadata.cpp")).unwrap();
    assert_eq!(source, "#include \"metadata.h\"\n");
}

#[test]
fn test_filters_narrow_the_output() {
    let temp_dir = TempDir::new().unwrap();
    sample_project(temp_dir.path());
    let files = collect_headers(temp_dir.path(), &discovery_options()).unwrap();

    let tagged = Pipeline::new(PipelineOptions {
        filter: ExtractorFilter::default().with_tagged_only(true),
        ..Default::default()
    });
    let report = tagged.run(&files).unwrap();
    let (enums, classes) = tagged.extract(&report);
    assert_eq!(enums.len(), 1);
    assert_eq!(enums[0].ty.id, "Kind");
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].ty.id, "Shape");

    let structs_only = Pipeline::new(PipelineOptions {
        filter: ExtractorFilter::new(EmitFlags::STRUCTS)
            .with_exclude(vec![Regex::new("^Nothing$").unwrap()]),
        ..Default::default()
    });
    let report = structs_only.run(&files).unwrap();
    let (enums, classes) = structs_only.extract(&report);
    assert!(enums.is_empty());
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].ty.id, "Circle");

    let excluded = Pipeline::new(PipelineOptions {
        filter: ExtractorFilter::default().with_exclude(vec![Regex::new("^geo::Shape").unwrap()]),
        ..Default::default()
    });
    let report = excluded.run(&files).unwrap();
    let (enums, classes) = excluded.extract(&report);
    assert_eq!(enums.len(), 1);
    assert_eq!(classes.len(), 1);
}

#[test]
fn test_cache_survives_runs_and_tracks_edits() {
    let temp_dir = TempDir::new().unwrap();
    sample_project(temp_dir.path());
    let cache_dir = temp_dir.path().join(".introspect-cache");
    let files = collect_headers(temp_dir.path(), &discovery_options()).unwrap();

    let pipeline = Pipeline::new(PipelineOptions {
        cache_dir: Some(cache_dir.clone()),
        parallelism: 2,
        ..Default::default()
    });

    assert_eq!(pipeline.run(&files).unwrap().cache_hits(), 0);
    assert!(cache_dir.join("index.json").exists());
    assert_eq!(pipeline.run(&files).unwrap().cache_hits(), 2);

    write(temp_dir.path(), "include/shapes.h", "enum class Kind { Only };");
    let report = pipeline.run(&files).unwrap();
    assert_eq!(report.cache_hits(), 1);
    let (enums, _) = pipeline.extract(&report);
    assert_eq!(enums.len(), 1);
    assert_eq!(enums[0].ty.enumerators, vec!["Only"]);

    assert!(SymTableCache::clear(&cache_dir).unwrap());
    assert!(!cache_dir.exists());
}
