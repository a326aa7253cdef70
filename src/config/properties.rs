//! Reading and writing the `server.properties` / `eula.txt` pair a server
//! directory carries.

use std::{collections::HashMap, path::Path};

use tokio::fs;

use super::validate::{self, DEFAULT_PORT};
use crate::error::{Error, Result};

pub const PROPERTIES_FILE: &str = "server.properties";
pub const EULA_FILE: &str = "eula.txt";

pub const EULA_CONTENTS: &str = "#Generated by craftkeeper\neula=true\n";

/// Operational fields pulled out of a properties file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProperties {
    pub port: u16,
    pub motd: String,
}

/// Parses `key=value` / `key:value` lines, skipping comments and blanks.
pub fn parse(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for raw in text.lines() {
        let line = raw.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let split_at = line.find(['=', ':']);
        let (key, value) = match split_at {
            Some(i) => (&line[..i], &line[i + 1..]),
            None => (line, ""),
        };

        map.insert(key.trim().to_string(), value.to_string());
    }

    map
}

/// Reverses the escaping applied to property values.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '=' => out.push_str("\\="),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Extracts port and motd, defaulting to 25565 and the sanitized name.
pub fn operational_fields(text: &str, name: &str) -> ServerProperties {
    let map = parse(text);

    let port = map
        .get("server-port")
        .and_then(|p| p.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let motd = map.get("motd").map(|m| unescape(m));
    let motd = validate::motd_or_name(motd.as_deref(), name);

    ServerProperties { port, motd }
}

/// Reads the properties file in `dir`, falling back to defaults when absent.
pub async fn read_operational(dir: &Path, name: &str) -> Result<ServerProperties> {
    let path = dir.join(PROPERTIES_FILE);
    match fs::read(&path).await {
        Ok(bytes) => Ok(operational_fields(&String::from_utf8_lossy(&bytes), name)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerProperties {
            port: DEFAULT_PORT,
            motd: validate::motd_or_name(None, name),
        }),
        Err(e) => Err(Error::fs_at("reading", &path, e)),
    }
}

pub fn render(props: &ServerProperties) -> String {
    format!(
        "#Minecraft server properties\n#Generated by craftkeeper\nserver-port={}\nquery.port={}\nmotd={}\n",
        props.port,
        props.port,
        escape(&props.motd)
    )
}
