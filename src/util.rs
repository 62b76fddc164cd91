// Copyright (c) 2018 Nuclear Furnace
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Small helpers shared across the config and filter layers.

use std::time::Duration;

use tracing::warn;

/// Parses a Go-`time.ParseDuration`-style string ("2s", "500ms", "1h"),
/// falling back to `default` on any parse failure rather than surfacing
/// an error, matching the permissive behavior of the source this crate
/// was ported from.
pub fn parse_duration_or_default(input: &str, default: Duration) -> Duration {
    parse_duration(input).unwrap_or_else(|| {
        warn!("[config] could not parse duration {:?}, falling back to {:?}", input, default);
        default
    })
}

fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let split_at = input.find(|c: char| !c.is_ascii_digit() && c != '.')?;
    let (magnitude, unit) = input.split_at(split_at);
    let magnitude: f64 = magnitude.parse().ok()?;

    let millis = match unit {
        "ns" => magnitude / 1_000_000.0,
        "us" | "\u{b5}s" => magnitude / 1_000.0,
        "ms" => magnitude,
        "s" => magnitude * 1_000.0,
        "m" => magnitude * 60_000.0,
        "h" => magnitude * 3_600_000.0,
        _ => return None,
    };

    if millis < 0.0 {
        return None;
    }

    Some(Duration::from_secs_f64(millis / 1_000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_suffixes() {
        assert_eq!(parse_duration("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("1m"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn falls_back_on_garbage() {
        assert_eq!(parse_duration_or_default("not-a-duration", Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(parse_duration_or_default("", Duration::from_secs(2)), Duration::from_secs(2));
    }

    #[test]
    fn rejects_unknown_suffix() {
        assert_eq!(parse_duration("2x"), None);
    }
}
