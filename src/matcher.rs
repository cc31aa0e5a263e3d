//! Path expression compilation and matching
//!
//! A [`PathMatcher`] is the compiled form of one registered path expression.
//! Grammar, one item per `/`-separated segment:
//!
//! - `users` - literal, compared ASCII case-insensitively
//! - `:id` - named parameter, matches one non-empty segment
//! - `:tab?` - optional named parameter
//! - `*` - wildcard, last segment only, matches the rest of the path
//!
//! A leading `/` is significant (`"users"` does not match `"/users"`); one
//! trailing `/` on either side is ignored. The expression `"$default"` compiles
//! to a catch-all matcher used as a namespace's fallback.

use crate::diagnostics::{report, Diagnostic};
use crate::error::PatternError;
use crate::params::RouteFields;
use crate::route::{RouteInstance, RouteTarget, RouterSnapshot};
use crate::trace_log;
use percent_encoding::percent_decode_str;
use std::fmt;
use std::sync::Arc;

/// Pattern string that registers a namespace's default route.
pub const DEFAULT_PATTERN: &str = "$default";

/// A parameter declared by a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    /// Parameter name. The wildcard is an unnamed capture and is named `"0"`.
    pub name: String,
    /// May be absent from a matching path.
    pub optional: bool,
    /// Captures the remainder of the path.
    pub wildcard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param { index: usize, optional: bool },
    Wildcard { index: usize },
}

/// Compiled path expression bound to a route type.
pub struct PathMatcher {
    pattern: String,
    segments: Vec<Segment>,
    params: Vec<ParamDescriptor>,
    is_default: bool,
    target: RouteTarget,
}

impl PathMatcher {
    /// Compile `pattern` for `target`.
    pub fn compile(pattern: &str, target: RouteTarget) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        if pattern == DEFAULT_PATTERN {
            return Ok(Self {
                pattern: pattern.to_string(),
                segments: Vec::new(),
                params: Vec::new(),
                is_default: true,
                target,
            });
        }

        if pattern.contains("//") {
            return Err(PatternError::ConsecutiveSlashes {
                pattern: pattern.to_string(),
            });
        }

        let raw: Vec<&str> = split_segments(pattern).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut params: Vec<ParamDescriptor> = Vec::new();

        for (position, segment) in raw.iter().enumerate() {
            if *segment == "*" {
                if position + 1 != raw.len() {
                    return Err(PatternError::WildcardNotLast {
                        pattern: pattern.to_string(),
                    });
                }
                segments.push(Segment::Wildcard {
                    index: params.len(),
                });
                params.push(ParamDescriptor {
                    name: "0".to_string(),
                    optional: false,
                    wildcard: true,
                });
            } else if let Some(declaration) = segment.strip_prefix(':') {
                let (name, optional) = match declaration.strip_suffix('?') {
                    Some(name) => (name, true),
                    None => (declaration, false),
                };
                validate_param_name(pattern, name, &params)?;
                segments.push(Segment::Param {
                    index: params.len(),
                    optional,
                });
                params.push(ParamDescriptor {
                    name: name.to_string(),
                    optional,
                    wildcard: false,
                });
            } else if segment.contains(':') || segment.contains('*') {
                return Err(PatternError::PartialSegment {
                    pattern: pattern.to_string(),
                    segment: (*segment).to_string(),
                });
            } else {
                segments.push(Segment::Static((*segment).to_string()));
            }
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            params,
            is_default: false,
            target,
        })
    }

    /// The expression this matcher was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Whether this is a namespace's `$default` matcher.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// The route type this matcher creates.
    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    /// Whether `path` matches. The default matcher matches everything.
    pub fn test(&self, path: &str) -> bool {
        self.is_default || self.capture(path).is_some()
    }

    /// Extract parameter values from `path`, one per descriptor.
    ///
    /// Returns an empty vector when `path` does not match. Values are
    /// percent-decoded; a value that cannot be decoded is passed through as-is
    /// and reported, so navigation never fails on a mistyped path.
    pub fn extract(&self, path: &str) -> Vec<Option<String>> {
        let Some(raw) = self.capture(path) else {
            return Vec::new();
        };
        raw.into_iter()
            .map(|value| value.map(|value| decode_component(&value)))
            .collect()
    }

    /// Create a new route instance from the values in `path`.
    pub fn create_route(self: &Arc<Self>, path: &str, router: RouterSnapshot<'_>) -> RouteInstance {
        trace_log!(
            "creating route {} for '{}' (pattern '{}')",
            self.target.type_name(),
            path,
            self.pattern
        );
        let fields = RouteFields::new(&self.params, self.extract(path));
        RouteInstance::create(Arc::clone(self), fields, router)
    }

    /// Update `route`'s parameters from `path` if this matcher created it.
    ///
    /// Returns `false` when `route` came from any other matcher, even one
    /// targeting the same route type; the caller must then recreate it.
    pub fn update_in_place(&self, route: &mut RouteInstance, path: &str) -> bool {
        if !std::ptr::eq(self, route.matcher().as_ref()) {
            return false;
        }
        trace_log!("updating route params in place for '{}'", path);
        route.fields_mut().assign(self.extract(path));
        true
    }

    fn capture(&self, path: &str) -> Option<Vec<Option<String>>> {
        if self.is_default {
            return Some(Vec::new());
        }
        let parts: Vec<&str> = split_segments(path).collect();
        let mut values = vec![None; self.params.len()];
        self.match_at(0, &parts, 0, &mut values).then_some(values)
    }

    fn match_at(
        &self,
        segment: usize,
        parts: &[&str],
        part: usize,
        values: &mut [Option<String>],
    ) -> bool {
        let Some(expected) = self.segments.get(segment) else {
            return part == parts.len();
        };

        match expected {
            Segment::Static(literal) => {
                parts
                    .get(part)
                    .is_some_and(|actual| actual.eq_ignore_ascii_case(literal))
                    && self.match_at(segment + 1, parts, part + 1, values)
            }
            Segment::Param { index, optional } => {
                if let Some(actual) = parts.get(part).filter(|actual| !actual.is_empty()) {
                    values[*index] = Some((*actual).to_string());
                    if self.match_at(segment + 1, parts, part + 1, values) {
                        return true;
                    }
                    values[*index] = None;
                }
                *optional && self.match_at(segment + 1, parts, part, values)
            }
            Segment::Wildcard { index } => {
                values[*index] = Some(parts.get(part..).unwrap_or_default().join("/"));
                true
            }
        }
    }
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher")
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .field("target", &self.target.type_name())
            .finish()
    }
}

/// Split on `/` after dropping one trailing slash.
fn split_segments(path: &str) -> std::str::Split<'_, char> {
    path.strip_suffix('/').unwrap_or(path).split('/')
}

fn validate_param_name(
    pattern: &str,
    name: &str,
    declared: &[ParamDescriptor],
) -> Result<(), PatternError> {
    if name.is_empty() {
        return Err(PatternError::EmptyParamName {
            pattern: pattern.to_string(),
        });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PatternError::InvalidParamName {
            pattern: pattern.to_string(),
            name: name.to_string(),
        });
    }
    if declared.iter().any(|param| param.name == name) {
        return Err(PatternError::DuplicateParam {
            pattern: pattern.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Percent-decode one path value, passing malformed input through untouched.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let well_formed_escapes = bytes.iter().enumerate().all(|(i, byte)| {
        *byte != b'%'
            || (bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    });

    let decoded = if well_formed_escapes {
        percent_decode_str(raw).decode_utf8().ok()
    } else {
        None
    };

    match decoded {
        Some(value) => value.into_owned(),
        None => {
            report(Diagnostic::MalformedComponent {
                value: raw.to_string(),
            });
            raw.to_string()
        }
    }
}
