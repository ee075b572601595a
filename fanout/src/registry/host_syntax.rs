// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Host arguments: `<a-b,c>` range expansion and `host:port` splitting.
//!
//! | Argument       | Expands to                       |
//! | :------------- | :------------------------------- |
//! | `web<1-3>`     | `web1`, `web2`, `web3`           |
//! | `web<3-1>`     | `web3`, `web2`, `web1`           |
//! | `db<08-10>`    | `db08`, `db09`, `db10`           |
//! | `n<1,4-5>`     | `n1`, `n4`, `n5`                 |
//! | `r<1-2>s<1-2>` | `r1s1`, `r1s2`, `r2s1`, `r2s2`   |

use std::fmt;

pub const DEFAULT_SSH_PORT: &str = "22";

/// One remote shell to start: where to connect, before any renaming.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostSpec {
    pub hostname: String,
    pub port: String,
}

impl HostSpec {
    /// Splits `host[:port]` at the first `:`.
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        match arg.split_once(':') {
            Some((hostname, port)) => Self {
                hostname: hostname.to_string(),
                port: port.to_string(),
            },
            None => Self {
                hostname: arg.to_string(),
                port: DEFAULT_SSH_PORT.to_string(),
            },
        }
    }

    /// What `{port}` becomes in the ssh template: nothing for the default port,
    /// `-p <port>` otherwise.
    #[must_use]
    pub fn port_argument(&self) -> String {
        if self.port == DEFAULT_SSH_PORT {
            String::new()
        } else {
            format!("-p {}", self.port)
        }
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == DEFAULT_SSH_PORT {
            write!(f, "{}", self.hostname)
        } else {
            write!(f, "{}:{}", self.hostname, self.port)
        }
    }
}

/// Expands every host argument, then splits each result into a [`HostSpec`].
#[must_use]
pub fn expand_host_args<S: AsRef<str>>(args: &[S]) -> Vec<HostSpec> {
    args.iter()
        .flat_map(|arg| expand_host_syntax(arg.as_ref()))
        .map(|host| HostSpec::parse(&host))
        .collect()
}

/// All the strings in the expansion of `input`. The first `<...>` group is expanded,
/// then the results are expanded again, so any number of groups works. Intervals that
/// don't start with a number are skipped.
#[must_use]
pub fn expand_host_syntax(input: &str) -> Vec<String> {
    let mut acc = Vec::new();
    expand_into(input, &mut acc);
    acc
}

fn expand_into(input: &str, acc: &mut Vec<String>) {
    let Some((start, end)) = find_range_group(input) else {
        acc.push(input.to_string());
        return;
    };

    let prefix = &input[..start];
    let suffix = &input[end + 1..];
    for interval in input[start + 1..end].split(',') {
        let Some((first, last)) = parse_interval(interval) else {
            continue;
        };
        for number in iter_numbers(first, last) {
            expand_into(&format!("{prefix}{number}{suffix}"), acc);
        }
    }
}

/// Byte offsets of the `<` and `>` of the first `<[0-9,-]+>` group.
fn find_range_group(input: &str) -> Option<(usize, usize)> {
    let bytes = input.as_bytes();
    let is_range_byte = |byte: u8| byte.is_ascii_digit() || byte == b',' || byte == b'-';

    for (open, _) in bytes.iter().enumerate().filter(|(_, byte)| **byte == b'<') {
        let body_len = bytes[open + 1..]
            .iter()
            .take_while(|byte| is_range_byte(**byte))
            .count();
        let close = open + 1 + body_len;
        if body_len > 0 && bytes.get(close) == Some(&b'>') {
            return Some((open, close));
        }
    }
    None
}

/// `12` or `12-34`, anything after that is ignored. Returns the bounds as written, to
/// keep their leading zeros.
fn parse_interval(interval: &str) -> Option<(&str, &str)> {
    let leading_digits = |text: &str| -> usize {
        text.bytes().take_while(u8::is_ascii_digit).count()
    };

    let first_len = leading_digits(interval);
    if first_len == 0 {
        return None;
    }
    let first = &interval[..first_len];

    let last = interval[first_len..]
        .strip_prefix('-')
        .map(|rest| &rest[..leading_digits(rest)])
        .filter(|rest| !rest.is_empty())
        .unwrap_or(first);

    Some((first, last))
}

fn iter_numbers(first: &str, last: &str) -> Vec<String> {
    let (Ok(from), Ok(to)) = (first.parse::<u64>(), last.parse::<u64>()) else {
        return Vec::new();
    };

    let has_leading_zero = |bound: &str| bound.len() > 1 && bound.starts_with('0');
    let width = if has_leading_zero(first) || has_leading_zero(last) {
        first.len().max(last.len())
    } else {
        0
    };

    let numbers: Box<dyn Iterator<Item = u64>> = if from <= to {
        Box::new(from..=to)
    } else {
        Box::new((to..=from).rev())
    };
    numbers.map(|number| format!("{number:0width$}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("host", &["host"] ; "no group")]
    #[test_case("web<1-3>", &["web1", "web2", "web3"] ; "ascending")]
    #[test_case("web<3-1>", &["web3", "web2", "web1"] ; "descending")]
    #[test_case("db<08-10>", &["db08", "db09", "db10"] ; "zero padded start")]
    #[test_case("db<8-010>", &["db008", "db009", "db010"] ; "zero padded end")]
    #[test_case("n<1,4-5>.lan", &["n1.lan", "n4.lan", "n5.lan"] ; "several intervals")]
    #[test_case("n<7>", &["n7"] ; "single number")]
    #[test_case("r<1-2>s<1-2>", &["r1s1", "r1s2", "r2s1", "r2s2"] ; "recursive")]
    #[test_case("n<-2,3>", &["n3"] ; "malformed interval skipped")]
    #[test_case("n<1-2x>", &["n<1-2x>"] ; "not a group")]
    #[test_case("a<b>c<1-2>", &["a<b>c1", "a<b>c2"] ; "first valid group")]
    fn test_expand_host_syntax(input: &str, expected: &[&str]) {
        assert_eq!(expand_host_syntax(input), expected);
    }

    #[test]
    fn test_host_spec_parse_and_port_argument() {
        let plain = HostSpec::parse("web1");
        assert_eq!(plain.port, "22");
        assert_eq!(plain.port_argument(), "");
        assert_eq!(plain.to_string(), "web1");

        let custom = HostSpec::parse("web1:2222");
        assert_eq!(custom.hostname, "web1");
        assert_eq!(custom.port_argument(), "-p 2222");
        assert_eq!(custom.to_string(), "web1:2222");
    }

    #[test]
    fn test_expand_host_args() {
        let hosts = expand_host_args(&["h<1-2>:2200", "db"]);
        assert_eq!(
            hosts,
            vec![
                HostSpec::parse("h1:2200"),
                HostSpec::parse("h2:2200"),
                HostSpec::parse("db"),
            ]
        );
    }
}
