//! Radix tree nodes.
//!
//! Each node owns one path segment. Matching prefers static children, then
//! the parameter child, then the wildcard child, and backtracks when a
//! preferred branch fails deeper in the path.

use crate::error::RouteError;
use crate::method_router::MethodRouter;
use crate::params::Params;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'p> {
    Static(&'p str),
    Param(&'p str),
    Wildcard(&'p str),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    segment: String,
    methods: Option<MethodRouter>,
    /// Sorted by segment for binary search.
    static_children: Vec<Node>,
    param_child: Option<Box<Node>>,
    wildcard_child: Option<Box<Node>>,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    fn named(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            ..Self::default()
        }
    }

    pub(crate) fn insert(&mut self, pattern: &str, methods: MethodRouter) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;
        self.insert_segments(&segments, methods, pattern)
    }

    fn insert_segments(
        &mut self,
        segments: &[Segment<'_>],
        methods: MethodRouter,
        pattern: &str,
    ) -> Result<(), RouteError> {
        let Some((first, rest)) = segments.split_first() else {
            return match &mut self.methods {
                Some(existing) => existing.merge(methods, pattern),
                None => {
                    self.methods = Some(methods);
                    Ok(())
                }
            };
        };

        match *first {
            Segment::Static(name) => {
                match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(name))
                {
                    Ok(i) => self.static_children[i].insert_segments(rest, methods, pattern),
                    Err(i) => {
                        let mut child = Node::named(name);
                        child.insert_segments(rest, methods, pattern)?;
                        self.static_children.insert(i, child);
                        Ok(())
                    }
                }
            }
            Segment::Param(name) => {
                let child = Self::dynamic_child(&mut self.param_child, name, pattern)?;
                child.insert_segments(rest, methods, pattern)
            }
            Segment::Wildcard(name) => {
                let child = Self::dynamic_child(&mut self.wildcard_child, name, pattern)?;
                child.insert_segments(rest, methods, pattern)
            }
        }
    }

    fn dynamic_child<'n>(
        slot: &'n mut Option<Box<Node>>,
        name: &str,
        pattern: &str,
    ) -> Result<&'n mut Node, RouteError> {
        let child = slot.get_or_insert_with(|| Box::new(Node::named(name)));
        if child.segment != name {
            return Err(RouteError::ParamConflict {
                pattern: pattern.to_string(),
                existing: child.segment.clone(),
                new: name.to_string(),
            });
        }
        Ok(child)
    }

    pub(crate) fn match_path(&self, path: &str) -> Option<(&MethodRouter, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let methods = self.match_segments(&segments, &mut params)?;
        Some((methods, params))
    }

    fn match_segments<'a>(&'a self, segments: &[&str], params: &mut Params) -> Option<&'a MethodRouter> {
        let Some((first, rest)) = segments.split_first() else {
            return self.methods.as_ref();
        };

        if let Ok(i) = self
            .static_children
            .binary_search_by(|c| c.segment.as_str().cmp(first))
        {
            if let Some(found) = self.static_children[i].match_segments(rest, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            let mark = params.len();
            params.push(child.segment.clone(), decode_segment(first));
            if let Some(found) = child.match_segments(rest, params) {
                return Some(found);
            }
            params.truncate(mark);
        }

        if let Some(child) = &self.wildcard_child {
            if let Some(methods) = &child.methods {
                let remainder: Vec<String> = segments.iter().map(|s| decode_segment(s)).collect();
                params.push(child.segment.clone(), remainder.join("/"));
                return Some(methods);
            }
        }

        None
    }
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::NotAbsolute {
            pattern: pattern.to_string(),
        });
    }

    let raw: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = Vec::with_capacity(raw.len());

    for (i, s) in raw.iter().enumerate() {
        let segment = if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Segment::Param(name)
        } else if let Some(name) = s.strip_prefix('*') {
            if i + 1 != raw.len() {
                return Err(RouteError::WildcardNotLast {
                    pattern: pattern.to_string(),
                });
            }
            Segment::Wildcard(name)
        } else {
            Segment::Static(s)
        };

        if matches!(segment, Segment::Param("") | Segment::Wildcard("")) {
            return Err(RouteError::UnnamedParam {
                pattern: pattern.to_string(),
            });
        }
        segments.push(segment);
    }

    Ok(segments)
}

// Percent-decodes a bound value; malformed escapes are kept verbatim.
fn decode_segment(raw: &str) -> String {
    if !raw.contains('%') {
        return raw.to_string();
    }

    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| raw.to_string())
}
