//! Dump command - Show the symbol table built for a single header

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use introspect_core::{
    parse_into, FileSource, Lexer, ParserError, ScopeId, SourceReader, SymTable, Type,
};
use serde::Serialize;

use super::{load_config, print_diagnostics};
use crate::GlobalOptions;

/// Arguments for the dump command
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Header file to parse
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct DumpOutput<'a> {
    table: &'a SymTable,
    diagnostics: &'a [ParserError],
}

/// Execute the dump command
pub fn execute(args: DumpArgs, global: GlobalOptions) -> Result<()> {
    let input_root = args
        .file
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    load_config(&global, &input_root, None)?;

    let mut lexer = Lexer::open(FileSource::new(&args.file))
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let mut table = SymTable::with_source_filename(lexer.source_name().to_string());
    let diagnostics = parse_into(&mut lexer, &mut table);
    let mut source = lexer.into_source();
    if let Some(e) = source.take_error() {
        return Err(e).with_context(|| format!("Failed to read {}", args.file.display()));
    }
    source.close()?;

    if args.json {
        let output = DumpOutput {
            table: &table,
            diagnostics: &diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render_tree(&table));
        print_diagnostics(&args.file, &diagnostics);
    }

    Ok(())
}

/// Indented text view of a scope tree.
fn render_tree(table: &SymTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", table.source_filename());
    render_children(table, ScopeId::GLOBAL, 1, &mut out);
    out
}

fn render_children(table: &SymTable, id: ScopeId, depth: usize, out: &mut String) {
    let scope = table.scope(id);
    let indent = "  ".repeat(depth);

    for symbol in scope.symbols() {
        let _ = writeln!(out, "{}symbol {}", indent, symbol.name);
    }

    for child in scope.nested() {
        let _ = writeln!(out, "{}{{anonymous #{}}}", indent, table.scope(*child).index());
        render_children(table, *child, depth + 1, out);
    }

    for (name, child) in scope.named() {
        let _ = writeln!(out, "{}{}", indent, describe(name, table.scope(*child).ty()));
        render_children(table, *child, depth + 1, out);
    }
}

fn describe(name: &str, ty: Option<&Type>) -> String {
    match ty {
        None => format!("scope {}", name),
        Some(Type::Base(_)) => format!("type {}", name),
        Some(Type::Namespace(_)) => format!("namespace {}", name),
        Some(Type::Enum(ty)) => {
            let mut text = String::from("enum ");
            if ty.is_strongly_typed {
                text.push_str("class ");
            }
            text.push_str(name);
            if ty.underlying_type != "int" || ty.is_strongly_typed {
                let _ = write!(text, " : {}", ty.underlying_type);
            }
            if ty.is_forward_declaration {
                text.push_str(" (forward)");
            } else {
                let _ = write!(text, " {{ {} }}", ty.enumerators.join(", "));
            }
            if ty.access_modifier != introspect_core::AccessModifier::Public {
                let _ = write!(text, " [{}]", ty.access_modifier.as_str());
            }
            text
        }
        Some(Type::Class(ty)) => {
            let mut text = String::new();
            if ty.is_template {
                text.push_str("template ");
            }
            text.push_str(if ty.is_struct { "struct " } else { "class " });
            text.push_str(name);
            if ty.is_final {
                text.push_str(" final");
            }
            if !ty.base_classes.is_empty() {
                let bases: Vec<String> = ty
                    .base_classes
                    .iter()
                    .map(|base| {
                        let virtual_kw = if base.is_virtual_inherited { "virtual " } else { "" };
                        format!("{}{} {}", virtual_kw, base.access.as_str(), base.full_name)
                    })
                    .collect();
                let _ = write!(text, " : {}", bases.join(", "));
            }
            if ty.is_forward_declaration {
                text.push_str(" (forward)");
            }
            if ty.access_modifier != introspect_core::AccessModifier::Public {
                let _ = write!(text, " [{}]", ty.access_modifier.as_str());
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use introspect_core::parse_str;

    #[test]
    fn test_render_tree() {
        let (table, errors) = parse_str(
            "shapes.h",
            "namespace geo {\n\
             enum class Kind : unsigned char { Circle, Square };\n\
             class Circle final : public virtual Shape { enum Hidden { X }; };\n\
             namespace { struct Local; }\n\
             }",
        );
        assert!(errors.is_empty());

        let expected = "shapes.h\n\
                        \x20 namespace geo\n\
                        \x20   {anonymous #0}\n\
                        \x20     struct Local (forward)\n\
                        \x20   enum class Kind : unsigned char { Circle, Square }\n\
                        \x20   class Circle final : virtual public Shape\n\
                        \x20     enum Hidden { X } [private]\n";
        assert_eq!(render_tree(&table), expected);
    }
}
