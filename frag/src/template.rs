//! Template expansion: `{{ path }}` substitution and `each ... end` loops.
//!
//! A template is parsed once by [`core::syntax`](crate::core::syntax) and can
//! be rendered any number of times. Rendering is pure and never fails: missing
//! paths, non-sequence loop targets and malformed tags degrade to text chosen
//! by [`RenderOptions::missing`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::core::path::{lookup_key, resolve};
use crate::core::syntax::{Diagnostic, Loop, Node, parse};
use crate::core::value::{MissingValue, render_lookup};

/// Rendering knobs shared by templates and the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub missing: MissingValue,
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
    diagnostics: Vec<Diagnostic>,
}

impl Template {
    pub fn compile(source: &str) -> Self {
        let parsed = parse(source);
        for diagnostic in &parsed.diagnostics {
            debug!(%diagnostic, "template diagnostic");
        }
        Self {
            nodes: parsed.nodes,
            diagnostics: parsed.diagnostics,
        }
    }

    /// Structural problems found at compile time, in source order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn render(&self, context: &Value, options: &RenderOptions) -> String {
        let mut scope = Scope {
            root: context,
            bindings: Vec::new(),
        };
        let mut out = String::new();
        render_nodes(&self.nodes, &mut scope, options, &mut out);
        out
    }
}

/// Compile and render `template` against `context` with default options.
pub fn expand(template: &str, context: &Value) -> String {
    Template::compile(template).render(context, &RenderOptions::default())
}

/// Lookup scopes: loop item bindings (innermost last) over the root context.
struct Scope<'a> {
    root: &'a Value,
    bindings: Vec<(&'a str, &'a Value)>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, path: &str) -> Option<&'a Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let bound = self
            .bindings
            .iter()
            .rev()
            .find(|(name, _)| *name == head)
            .map(|(_, value)| *value);
        match (bound, rest) {
            (Some(item), None) => Some(item),
            (Some(item), Some(rest)) => resolve(item, rest),
            (None, _) => resolve(self.root, path),
        }
    }
}

fn render_nodes<'a>(
    nodes: &'a [Node],
    scope: &mut Scope<'a>,
    options: &RenderOptions,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Path(path) => out.push_str(&render_lookup(scope.lookup(path), options.missing)),
            Node::This(key) => {
                out.push_str(&render_lookup(lookup_key(scope.root, key), options.missing));
            }
            Node::Loop(lp) => render_loop(lp, scope, options, out),
        }
    }
}

fn render_loop<'a>(lp: &'a Loop, scope: &mut Scope<'a>, options: &RenderOptions, out: &mut String) {
    let Some(Value::Array(items)) = scope.lookup(&lp.list) else {
        trace!(list = %lp.list, "loop target is not a sequence");
        return;
    };
    for item in items {
        scope.bindings.push((lp.item.as_str(), item));
        render_nodes(&lp.body, scope, options, out);
        scope.bindings.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy() -> RenderOptions {
        RenderOptions {
            missing: MissingValue::Undefined,
        }
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "<p>plain { braces } and }} stray</p>";
        assert_eq!(expand(input, &json!({"a": 1})), input);
    }

    #[test]
    fn expansion_is_idempotent_on_resolved_output() {
        let once = expand("Hello {{ user.name }}!", &json!({"user": {"name": "Ana"}}));
        assert_eq!(once, "Hello Ana!");
        assert_eq!(expand(&once, &json!({})), once);
    }

    #[test]
    fn loop_renders_items_in_order_without_separator() {
        let out = expand(
            "{{ each items as x }}{{ x.name }}{{ end }}",
            &json!({"items": [{"name": "A"}, {"name": "B"}]}),
        );
        assert_eq!(out, "AB");
    }

    #[test]
    fn this_prefix_reads_top_level_key() {
        assert_eq!(expand("{{ this.title }}", &json!({"title": "Hi"})), "Hi");
    }

    #[test]
    fn this_prefix_does_not_walk_paths() {
        let ctx = json!({"a": {"b": "nested"}, "a.b": "flat"});
        assert_eq!(expand("{{ this.a.b }}", &ctx), "flat");
    }

    #[test]
    fn bare_item_substitutes_the_value() {
        let out = expand(
            "{{ each tags }}[{{ item }}]{{ end }}",
            &json!({"tags": ["x", "y", 3]}),
        );
        assert_eq!(out, "[x][y][3]");
    }

    #[test]
    fn loop_body_falls_back_to_outer_context() {
        let out = expand(
            "{{ each people as p }}{{ p.name }}@{{ site }};{{ end }}",
            &json!({"site": "frag", "people": [{"name": "a"}, {"name": "b"}]}),
        );
        assert_eq!(out, "a@frag;b@frag;");
    }

    #[test]
    fn nested_loops_see_enclosing_items() {
        let ctx = json!({
            "groups": [
                {"name": "g1", "members": ["a", "b"]},
                {"name": "g2", "members": ["c"]}
            ]
        });
        let out = expand(
            "{{ each groups as g }}{{ g.name }}:{{ each g.members as m }}{{ m }}{{ g.name }} {{ end }}|{{ end }}",
            &ctx,
        );
        assert_eq!(out, "g1:ag1 bg1 |g2:cg2 |");
    }

    #[test]
    fn non_sequence_loop_target_renders_empty() {
        let template = "<{{ each items as x }}{{ x }}{{ end }}>";
        assert_eq!(expand(template, &json!({"items": {"a": 1}})), "<>");
        assert_eq!(expand(template, &json!({})), "<>");
    }

    #[test]
    fn unclosed_loop_renders_nothing_but_keeps_trailing_text() {
        let template = Template::compile("<p>{{ each items as x }}</p><footer>{{ title }}</footer>");
        assert_eq!(
            template.render(&json!({"items": [1], "title": "T"}), &RenderOptions::default()),
            "<p></p><footer>T</footer>"
        );
        assert_eq!(template.diagnostics().len(), 1);
    }

    #[test]
    fn missing_values_render_blank_by_default() {
        assert_eq!(expand("[{{ nope.deeper }}]", &json!({})), "[]");
    }

    #[test]
    fn legacy_mode_renders_undefined_literal() {
        let template = Template::compile("[{{ nope }}|{{ this.nope }}|{{ n }}]");
        assert_eq!(
            template.render(&json!({"n": null}), &legacy()),
            "[undefined|undefined|undefined]"
        );
    }

    #[test]
    fn output_is_not_rescanned() {
        let ctx = json!({"raw": "{{ secret }}", "secret": "leak"});
        assert_eq!(expand("{{ raw }}", &ctx), "{{ secret }}");
    }

    #[test]
    fn item_name_shadows_root_key() {
        let ctx = json!({"x": "root", "list": ["inner"]});
        assert_eq!(
            expand("{{ x }}{{ each list as x }}{{ x }}{{ end }}{{ x }}", &ctx),
            "rootinnerroot"
        );
    }
}
