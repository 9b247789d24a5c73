//! Template parsing into a small node tree.
//!
//! Placeholders are `{{ ... }}` tags found in a single left-to-right scan.
//! `each <list> [as <item>]` opens a loop that the nearest following `end`
//! closes; loops nest. Malformed structure never fails the parse: it is
//! reported as a [`Diagnostic`] and degrades to empty output.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").unwrap());
static EACH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^each\s+([\w.]+)(?:\s+as\s+(\w+))?$").unwrap());

/// Item name bound inside a loop without an `as` clause.
pub const DEFAULT_ITEM_NAME: &str = "item";

const END_KEYWORD: &str = "end";
const THIS_PREFIX: &str = "this.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text copied to the output.
    Text(String),
    /// Dotted path resolved through the active scopes.
    Path(String),
    /// `this.<key>`: exact-key lookup against the root context.
    This(String),
    Loop(Loop),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    /// Dotted path of the sequence to iterate.
    pub list: String,
    /// Name each element is bound to inside `body`.
    pub item: String,
    pub body: Vec<Node>,
}

/// Structural problem found while parsing. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An `each` tag with no matching `end`; the loop renders nothing and the
    /// text after it belongs to the enclosing scope.
    UnclosedLoop { list: String, offset: usize },
    /// An `end` tag with no open loop; rendered as a lookup of `end`.
    StrayEnd { offset: usize },
    /// A tag starting with `each` that is not a valid loop opener.
    MalformedLoop { tag: String, offset: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnclosedLoop { list, offset } => {
                write!(f, "byte {}: loop over '{}' has no matching end", offset, list)
            }
            Diagnostic::StrayEnd { offset } => {
                write!(f, "byte {}: end without an open loop", offset)
            }
            Diagnostic::MalformedLoop { tag, offset } => {
                write!(f, "byte {}: malformed loop opener '{}'", offset, tag)
            }
        }
    }
}

/// Parsed template: node tree plus any diagnostics collected on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    pub nodes: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Open loop awaiting its `end`.
struct Frame {
    list: String,
    item: String,
    offset: usize,
    body: Vec<Node>,
}

enum Tag<'a> {
    Each { list: &'a str, item: &'a str },
    MalformedEach,
    End,
    This(&'a str),
    Path(&'a str),
}

fn classify(inner: &str) -> Tag<'_> {
    if inner == END_KEYWORD {
        return Tag::End;
    }
    let is_loop = inner
        .strip_prefix("each")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace);
    if is_loop {
        return match EACH_RE.captures(inner) {
            Some(caps) => Tag::Each {
                list: caps.get(1).map_or("", |m| m.as_str()),
                item: caps.get(2).map_or(DEFAULT_ITEM_NAME, |m| m.as_str()),
            },
            None => Tag::MalformedEach,
        };
    }
    if let Some(key) = inner.strip_prefix(THIS_PREFIX) {
        return Tag::This(key);
    }
    Tag::Path(inner)
}

/// Parse `source` into nodes. Always succeeds.
pub fn parse(source: &str) -> Parsed {
    let mut root: Vec<Node> = Vec::new();
    let mut open: Vec<Frame> = Vec::new();
    let mut diagnostics = Vec::new();
    let mut cursor = 0;

    for caps in TAG_RE.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        let inner = caps.get(1).map_or("", |m| m.as_str());
        let offset = whole.start();

        let target = open.last_mut().map_or(&mut root, |frame| &mut frame.body);
        if offset > cursor {
            target.push(Node::Text(source[cursor..offset].to_string()));
        }
        cursor = whole.end();

        match classify(inner) {
            Tag::Each { list, item } => open.push(Frame {
                list: list.to_string(),
                item: item.to_string(),
                offset,
                body: Vec::new(),
            }),
            Tag::MalformedEach => {
                diagnostics.push(Diagnostic::MalformedLoop {
                    tag: inner.to_string(),
                    offset,
                });
            }
            Tag::End => match open.pop() {
                Some(frame) => {
                    let node = Node::Loop(Loop {
                        list: frame.list,
                        item: frame.item,
                        body: frame.body,
                    });
                    open.last_mut()
                        .map_or(&mut root, |parent| &mut parent.body)
                        .push(node);
                }
                None => {
                    diagnostics.push(Diagnostic::StrayEnd { offset });
                    root.push(Node::Path(END_KEYWORD.to_string()));
                }
            },
            Tag::This(key) => target.push(Node::This(key.to_string())),
            Tag::Path(path) => target.push(Node::Path(path.to_string())),
        }
    }

    if cursor < source.len() {
        open.last_mut()
            .map_or(&mut root, |frame| &mut frame.body)
            .push(Node::Text(source[cursor..].to_string()));
    }

    // An unclosed loop renders nothing itself; what followed its opener is
    // handed back to the enclosing scope, innermost first.
    while let Some(frame) = open.pop() {
        diagnostics.push(Diagnostic::UnclosedLoop {
            list: frame.list,
            offset: frame.offset,
        });
        open.last_mut()
            .map_or(&mut root, |parent| &mut parent.body)
            .extend(frame.body);
    }
    diagnostics.sort_by_key(Diagnostic::offset);

    Parsed {
        nodes: root,
        diagnostics,
    }
}

impl Diagnostic {
    /// Byte offset of the offending tag in the source.
    pub fn offset(&self) -> usize {
        match self {
            Diagnostic::UnclosedLoop { offset, .. }
            | Diagnostic::StrayEnd { offset }
            | Diagnostic::MalformedLoop { offset, .. } => *offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn path(s: &str) -> Node {
        Node::Path(s.to_string())
    }

    #[test]
    fn plain_text_is_a_single_node() {
        let parsed = parse("no tags here");
        assert_eq!(parsed.nodes, vec![text("no tags here")]);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn placeholders_trim_inner_whitespace() {
        let parsed = parse("a{{x}}b{{  y.z  }}");
        assert_eq!(
            parsed.nodes,
            vec![text("a"), path("x"), text("b"), path("y.z")]
        );
    }

    #[test]
    fn this_prefix_becomes_key_lookup() {
        let parsed = parse("{{ this.title }}");
        assert_eq!(parsed.nodes, vec![Node::This("title".to_string())]);
    }

    #[test]
    fn loop_collects_body_until_end() {
        let parsed = parse("<ul>{{ each items as x }}<li>{{ x.name }}</li>{{ end }}</ul>");
        assert_eq!(
            parsed.nodes,
            vec![
                text("<ul>"),
                Node::Loop(Loop {
                    list: "items".to_string(),
                    item: "x".to_string(),
                    body: vec![text("<li>"), path("x.name"), text("</li>")],
                }),
                text("</ul>"),
            ]
        );
    }

    #[test]
    fn loop_without_as_binds_default_item() {
        let parsed = parse("{{ each rows }}{{ item }}{{ end }}");
        let Node::Loop(lp) = &parsed.nodes[0] else {
            panic!("expected loop node");
        };
        assert_eq!(lp.item, DEFAULT_ITEM_NAME);
    }

    #[test]
    fn loops_nest() {
        let parsed =
            parse("{{ each groups as g }}[{{ each g.members as m }}{{ m }}{{ end }}]{{ end }}");
        let Node::Loop(outer) = &parsed.nodes[0] else {
            panic!("expected outer loop");
        };
        assert_eq!(outer.list, "groups");
        let Node::Loop(inner) = &outer.body[1] else {
            panic!("expected inner loop");
        };
        assert_eq!(inner.list, "g.members");
        assert_eq!(inner.body, vec![path("m")]);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn unclosed_loop_hands_trailing_nodes_back() {
        let parsed = parse("before{{ each items as x }}{{ x }} after");
        assert_eq!(parsed.nodes, vec![text("before"), path("x"), text(" after")]);
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::UnclosedLoop {
                list: "items".to_string(),
                offset: 6,
            }]
        );
    }

    #[test]
    fn unclosed_outer_loop_keeps_closed_inner_loop() {
        let parsed = parse("{{ each a as x }}<{{ each b as y }}{{ y }}>{{ end }}!");
        assert_eq!(
            parsed.nodes,
            vec![
                text("<"),
                Node::Loop(Loop {
                    list: "b".to_string(),
                    item: "y".to_string(),
                    body: vec![path("y"), text(">")],
                }),
                text("!"),
            ]
        );
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::UnclosedLoop {
                list: "a".to_string(),
                offset: 0,
            }]
        );
    }

    #[test]
    fn stray_end_is_reported_and_kept_as_lookup() {
        let parsed = parse("a{{ end }}b");
        assert_eq!(parsed.nodes, vec![text("a"), path("end"), text("b")]);
        assert_eq!(parsed.diagnostics, vec![Diagnostic::StrayEnd { offset: 1 }]);
    }

    #[test]
    fn malformed_opener_is_reported() {
        let parsed = parse("{{ each items as }}");
        assert!(parsed.nodes.is_empty());
        assert!(matches!(
            parsed.diagnostics.as_slice(),
            [Diagnostic::MalformedLoop { .. }]
        ));
    }

    #[test]
    fn word_starting_with_each_is_a_path() {
        let parsed = parse("{{ eachother }}");
        assert_eq!(parsed.nodes, vec![path("eachother")]);
    }
}
