//! File server list parsing

/// IRC channel membership prefixes (voice, op, halfop, owner, admin)
const MODE_PREFIXES: &[char] = &['+', '@', '%', '~', '&'];

/// Parse a comma or whitespace separated list of server nicknames
///
/// Mode prefixes are stripped and empty entries dropped; order is preserved.
pub fn parse_servers(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .map(|name| name.trim_start_matches(MODE_PREFIXES))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
