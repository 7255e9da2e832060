//! Node rendering.
//!
//! Resolution follows three stages in a fixed order:
//!
//! 1. `formatDuration` / `formatNumberUser` against the top-level context
//!    (`add` is always left for the loop stage),
//! 2. plain `{{path}}` against the top-level context,
//! 3. `{{#each}}` expansion, where whatever stages 1 and 2 left unresolved in
//!    the body is resolved against the loop item.
//!
//! Substituted values are emitted as text and never scanned again.

use serde_json::Value;
use tracing::warn;

use super::context::{lookup, to_text};
use super::helpers::{self, as_number, Helper};
use super::parse::{Expr, Node, Tag};

pub fn render_nodes(nodes: &[Node], context: &Value) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Tag(tag) => match resolve_outer(tag, context) {
                Some(text) => out.push_str(&text),
                None => out.push_str(&tag.raw),
            },
            Node::Each { key, body } => expand_each(&mut out, key, body, context),
        }
    }
    out
}

fn expand_each(out: &mut String, key: &str, body: &[Node], context: &Value) {
    let items = match lookup(context, key) {
        Some(Value::Array(items)) => items,
        other => {
            warn!(key, value = ?other, "each target is not an array");
            return;
        }
    };

    // Stages 1 and 2 do not depend on the item, so resolve them once.
    let outer: Vec<Option<String>> = body
        .iter()
        .map(|node| match node {
            Node::Tag(tag) => resolve_outer(tag, context),
            _ => None,
        })
        .collect();

    for (index, item) in items.iter().enumerate() {
        for (node, outer) in body.iter().zip(&outer) {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Tag(tag) => match outer.clone().or_else(|| resolve_item(tag, item, index)) {
                    Some(text) => out.push_str(&text),
                    None => out.push_str(&tag.raw),
                },
                Node::Each { .. } => {}
            }
        }
    }
}

/// Stages 1 and 2.
fn resolve_outer(tag: &Tag, context: &Value) -> Option<String> {
    match &tag.expr {
        Expr::Helper {
            helper: Helper::Add,
            ..
        } => None,
        Expr::Helper { helper, args } => {
            let value = lookup(context, args.first()?)?;
            helper.format(value)
        }
        Expr::Path(path) => lookup(context, path).and_then(to_text),
    }
}

/// Stage 3, per loop item.
fn resolve_item(tag: &Tag, item: &Value, index: usize) -> Option<String> {
    match &tag.expr {
        Expr::Helper {
            helper: Helper::Add,
            args,
        } => {
            let lhs = item_value(item, index, args.first()?)?;
            let lhs = as_number(&lhs).filter(|n| n.fract() == 0.0)? as i64;
            let rhs = args.get(1)?.parse::<i64>().ok()?;
            Some(helpers::add(lhs, rhs).to_string())
        }
        Expr::Helper { helper, args } => {
            let value = item_value(item, index, args.first()?)?;
            helper.format(&value)
        }
        Expr::Path(path) => item_value(item, index, path).and_then(|v| to_text(&v)),
    }
}

/// Dotted walk through the loop item where an `@index` segment stands for the
/// current iteration.
fn item_value(item: &Value, index: usize, path: &str) -> Option<Value> {
    let mut value = item;
    let mut segments = path.split('.');
    while let Some(key) = segments.next() {
        match value.as_object().and_then(|map| map.get(key)) {
            Some(next) => value = next,
            // A number has no fields, only further `@index` segments can follow.
            None if key == "@index" => {
                return segments.all(|k| k == "@index").then(|| Value::from(index));
            }
            None => return None,
        }
    }
    Some(value.clone())
}

#[cfg(test)]
mod tests {
    use super::super::parse::parse;
    use super::*;
    use serde_json::json;

    fn render(source: &str, context: Value) -> String {
        render_nodes(&parse(source), &context)
    }

    #[test]
    fn test_plain_substitution() {
        let out = render(
            "<h2>{{album.title}}</h2><span>{{total}}</span>",
            json!({ "album": { "title": "Midnights" }, "total": 13 }),
        );
        assert_eq!(out, "<h2>Midnights</h2><span>13</span>");
    }

    #[test]
    fn test_unresolved_left_verbatim() {
        let out = render("{{missing}} {{album.nope}} {{ spaced }}", json!({ "album": {} }));
        assert_eq!(out, "{{missing}} {{album.nope}} {{ spaced }}");
    }

    #[test]
    fn test_top_level_helpers() {
        let out = render(
            "{{formatDuration currentTrack.duration}} / {{formatNumberUser plays}}",
            json!({ "currentTrack": { "duration": 75 }, "plays": 1234567 }),
        );
        assert_eq!(out, "1:15 / 1,234,567");
    }

    #[test]
    fn test_top_level_helper_unresolved_stays() {
        let out = render("{{formatDuration nothing}}", json!({}));
        assert_eq!(out, "{{formatDuration nothing}}");
    }

    #[test]
    fn test_add_outside_loop_is_left() {
        let out = render("{{add total 1}}", json!({ "total": 3 }));
        assert_eq!(out, "{{add total 1}}");
    }

    #[test]
    fn test_each_with_index_ordinal() {
        let out = render(
            "{{#each items}}{{add @index 1}}. {{name}}{{/each}}",
            json!({ "items": [{ "name": "A" }, { "name": "B" }, { "name": "C" }] }),
        );
        assert_eq!(out, "1. A2. B3. C");
    }

    #[test]
    fn test_each_item_helpers_and_index() {
        let out = render(
            "{{#each tracks}}[{{@index}}|{{formatDuration duration}}|{{formatNumberUser play_count}}]{{/each}}",
            json!({ "tracks": [
                { "duration": 4, "play_count": 1000 },
                { "duration": 200, "play_count": 12 }
            ] }),
        );
        assert_eq!(out, "[0|0:04|1,000][1|3:20|12]");
    }

    #[test]
    fn test_each_outer_context_wins_for_shared_keys() {
        let out = render(
            "{{#each tracks}}{{album.title}}:{{title}};{{/each}}",
            json!({ "album": { "title": "X" }, "tracks": [{ "title": "a" }, { "title": "b" }] }),
        );
        assert_eq!(out, "X:a;X:b;");
    }

    #[test]
    fn test_each_non_array_renders_empty() {
        let out = render("<ul>{{#each albums}}<li>{{title}}</li>{{/each}}</ul>", json!({ "albums": "nope" }));
        assert_eq!(out, "<ul></ul>");
        let out = render("{{#each albums}}x{{/each}}", json!({}));
        assert_eq!(out, "");
    }

    #[test]
    fn test_each_unresolved_item_keys_stay() {
        let out = render("{{#each xs}}{{nope}}{{/each}}", json!({ "xs": [{}, {}] }));
        assert_eq!(out, "{{nope}}{{nope}}");
    }

    #[test]
    fn test_substituted_text_not_rescanned() {
        let out = render(
            "{{a}}|{{#each xs}}{{v}}{{/each}}",
            json!({ "a": "{{b}}", "b": "no", "xs": [{ "v": "{{/each}}" }] }),
        );
        assert_eq!(out, "{{b}}|{{/each}}");
    }
}
