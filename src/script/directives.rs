/// Directive parser for script files
///
/// Extracts `#r` and `#load` directives from script text. Malformed directives are
/// reported as diagnostics and skipped so the rest of the file is still scanned.
use std::path::Path;

use crate::error::DirectiveDiagnostic;
use crate::package::PackageReference;

/// Prefix selecting package shorthand in `#r` directives
pub const PACKAGE_PREFIX: &str = "package:";
/// Prefix selecting platform-SDK (framework) shorthand in `#r` directives
pub const SDK_PREFIX: &str = "sdk:";

const REFERENCE_TOKEN: &str = "#r";
const LOAD_TOKEN: &str = "#load";

/// What a `#r` directive refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    Package(PackageReference),
    Framework(String),
    /// Plain file path or assembly name, handled outside the package pipeline
    File(String),
}

/// A single directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Reference(ReferenceKind),
    Load(String),
}

/// A directive together with where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirective {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    pub directive: Directive,
}

/// Parse all directives in a script's content
pub fn parse_directives(
    path: &Path,
    content: &str,
) -> (Vec<ParsedDirective>, Vec<DirectiveDiagnostic>) {
    let mut directives = Vec::new();
    let mut diagnostics = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        let (token, rest) = if let Some(rest) = strip_token(trimmed, LOAD_TOKEN) {
            (LOAD_TOKEN, rest)
        } else if let Some(rest) = strip_token(trimmed, REFERENCE_TOKEN) {
            (REFERENCE_TOKEN, rest)
        } else {
            continue;
        };

        let diagnostic = |message: String| DirectiveDiagnostic {
            file: path.to_path_buf(),
            line: index + 1,
            directive: trimmed.to_string(),
            message,
        };

        let argument = match quoted_argument(rest) {
            Ok(argument) => argument,
            Err(message) => {
                diagnostics.push(diagnostic(message));
                continue;
            }
        };

        let directive = if token == LOAD_TOKEN {
            if has_prefix(argument, PACKAGE_PREFIX) || has_prefix(argument, SDK_PREFIX) {
                diagnostics.push(diagnostic(
                    "#load only accepts script file paths".to_string(),
                ));
                continue;
            }
            Directive::Load(argument.to_string())
        } else {
            match classify_reference(argument) {
                Ok(kind) => Directive::Reference(kind),
                Err(message) => {
                    diagnostics.push(diagnostic(message));
                    continue;
                }
            }
        };

        directives.push(ParsedDirective {
            line: index + 1,
            text: trimmed.to_string(),
            directive,
        });
    }

    (directives, diagnostics)
}

/// Classify raw `#r` text by its case-insensitive prefix
pub fn classify_reference(text: &str) -> Result<ReferenceKind, String> {
    if let Some(shorthand) = strip_prefix_ignore_case(text, PACKAGE_PREFIX) {
        return PackageReference::parse_shorthand(shorthand)
            .map(ReferenceKind::Package)
            .ok_or_else(|| format!("Invalid package reference: '{}'", shorthand.trim()));
    }

    if let Some(name) = strip_prefix_ignore_case(text, SDK_PREFIX) {
        let name = name.trim();
        if name.is_empty() {
            return Err("Missing SDK name".to_string());
        }
        return Ok(ReferenceKind::Framework(name.to_string()));
    }

    let text = text.trim();
    if text.is_empty() {
        return Err("Empty reference".to_string());
    }
    Ok(ReferenceKind::File(text.to_string()))
}

pub(crate) fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let text = text.trim_start();
    match text.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&text[prefix.len()..]),
        _ => None,
    }
}

fn has_prefix(text: &str, prefix: &str) -> bool {
    strip_prefix_ignore_case(text, prefix).is_some()
}

/// Match `token` followed by whitespace or an opening quote
fn strip_token<'a>(line: &'a str, token: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(token)?;
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '"' => Some(rest),
        _ => None,
    }
}

fn quoted_argument(rest: &str) -> Result<&str, String> {
    let rest = rest.trim();
    let inner = rest
        .strip_prefix('"')
        .ok_or_else(|| "Expected a quoted argument".to_string())?;
    let end = inner
        .find('"')
        .ok_or_else(|| "Unterminated quoted argument".to_string())?;

    let trailing = inner[end + 1..].trim();
    if !trailing.is_empty() && !trailing.starts_with("//") && trailing != ";" {
        return Err(format!("Unexpected text after argument: '{}'", trailing));
    }

    Ok(&inner[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> (Vec<ParsedDirective>, Vec<DirectiveDiagnostic>) {
        parse_directives(Path::new("main.csx"), content)
    }

    #[test]
    fn test_parse_reference_kinds() {
        let (directives, diagnostics) = parse(
            r#"#r "package: AutoMapper, 10.1.1"
#r "NuGet-Free.dll"
  #r "SDK:Microsoft.AspNetCore.App"
#load "shared/util.csx" // helpers
Console.WriteLine("hi");
"#,
        );

        assert!(diagnostics.is_empty());
        assert_eq!(directives.len(), 4);
        assert_eq!(
            directives[0].directive,
            Directive::Reference(ReferenceKind::Package(PackageReference::new(
                "AutoMapper",
                "10.1.1"
            )))
        );
        assert_eq!(
            directives[1].directive,
            Directive::Reference(ReferenceKind::File("NuGet-Free.dll".to_string()))
        );
        assert_eq!(
            directives[2].directive,
            Directive::Reference(ReferenceKind::Framework(
                "Microsoft.AspNetCore.App".to_string()
            ))
        );
        assert_eq!(
            directives[3].directive,
            Directive::Load("shared/util.csx".to_string())
        );
        assert_eq!(directives[3].line, 4);
    }

    #[test]
    fn test_package_prefix_is_case_insensitive() {
        match classify_reference("PACKAGE:Serilog").unwrap() {
            ReferenceKind::Package(pkg) => {
                assert_eq!(pkg.name, "Serilog");
                assert!(!pkg.is_pinned());
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_directives_are_skipped() {
        let (directives, diagnostics) = parse(
            r#"#r package: Missing.Quotes
#r "package: , 1.0"
#load "package: Foo, 1.0"
#r "unterminated
#region not a directive
#r "package: Good, 1.0.0"
"#,
        );

        assert_eq!(directives.len(), 1);
        assert_eq!(diagnostics.len(), 4);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(diagnostics[1].line, 2);
        assert_eq!(diagnostics[2].line, 3);
        assert_eq!(diagnostics[3].line, 4);
        assert_eq!(directives[0].line, 6);
    }
}
