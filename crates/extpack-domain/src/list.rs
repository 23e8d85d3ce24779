//! Decoder for the list literals waf stores in its cache (`['/a', '/b']`).

const ITEM_SEPARATOR: &str = "', ";

/// Splits a raw `_export_paths` value into the directories it names.
///
/// Accepts a bracketed list literal, a bare sequence of quoted strings, or a single
/// unquoted path. Empty items are dropped.
pub fn decode_path_list(raw: &str) -> Vec<String> {
    if raw.starts_with('\'') {
        decode_items(raw, "'", "'")
    } else if raw.starts_with("['") {
        decode_items(raw, "['", "']")
    } else if raw.is_empty() {
        Vec::new()
    } else {
        vec![raw.to_string()]
    }
}

fn decode_items(raw: &str, open: &str, close: &str) -> Vec<String> {
    raw.split(ITEM_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let item = item
                .strip_prefix(open)
                .or_else(|| item.strip_prefix('\''))
                .unwrap_or(item);
            let item = item.strip_suffix(close).unwrap_or(item);
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}
