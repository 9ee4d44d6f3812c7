//! Mapper configuration files.
//!
//! Two formats are accepted, chosen by file extension:
//!
//! - JSON (any extension other than `.toml`): an object `{"map": [...]}` or,
//!   for older configs, a bare array of mapping records.
//! - TOML (`.toml`): `[[map]]` tables with the same fields.
//!
//! Missing optional fields take their defaults (`mode` 0644, `dirmode` 0755,
//! `uid`/`gid` 0, `clobber` false). Unknown fields are ignored.
use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fs::{self, Filesystem};
use crate::mapper::Mapper;
use crate::mapping::Mapping;

/// Mode given to mapped files when the config does not specify one.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode given to created directories when the config does not specify one.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Mode of config files written by [`write_mapper`].
const CONFIG_FILE_MODE: u32 = 0o644;

/// On-disk shape of a mapper config.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MapperFile {
    #[serde(default)]
    map: Vec<Mapping>,
}

/// Load a mapper config from `path` through `fs`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is malformed.
pub fn load_mapper(fs: &dyn Filesystem, path: &Path) -> Result<Mapper, ConfigError> {
    let bytes = fs::read_all(fs, path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let origin = path.display().to_string();
    if is_toml(path) {
        let text = std::str::from_utf8(&bytes).map_err(|e| parse_error(&origin, e))?;
        parse_toml(text, &origin)
    } else {
        parse_json(&bytes, &origin)
    }
}

/// Serialize `mapper` as JSON and write it to `path` through `fs`, creating
/// or truncating the file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be written.
pub fn write_mapper(fs: &dyn Filesystem, path: &Path, mapper: &Mapper) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json = mapper.to_json();
    let mut out = fs.open_write(path, CONFIG_FILE_MODE).map_err(io_error)?;
    out.write_all(json.as_bytes()).map_err(io_error)?;
    out.write_all(b"\n").map_err(io_error)?;
    out.flush().map_err(io_error)
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn parse_error(origin: &str, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    }
}

/// Parse a JSON mapper document, accepting both the wrapped and bare forms.
pub(crate) fn parse_json(bytes: &[u8], origin: &str) -> Result<Mapper, ConfigError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| parse_error(origin, e))?;
    let mappings = match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value::<Vec<Mapping>>(value).map_err(|e| parse_error(origin, e))?
        }
        serde_json::Value::Object(_) => {
            serde_json::from_value::<MapperFile>(value)
                .map_err(|e| parse_error(origin, e))?
                .map
        }
        other => {
            return Err(parse_error(
                origin,
                format!(
                    "expected an object with a \"map\" array or an array of mappings, found {}",
                    json_type(&other)
                ),
            ));
        }
    };
    Ok(Mapper::new(mappings))
}

/// Parse a TOML mapper document (`[[map]]` tables).
pub(crate) fn parse_toml(text: &str, origin: &str) -> Result<Mapper, ConfigError> {
    let file: MapperFile = toml::from_str(text).map_err(|e| parse_error(origin, e))?;
    Ok(Mapper::new(file.map))
}

/// Serialize mappings in the wrapped JSON form.
pub(crate) fn to_json(mappings: &[Mapping]) -> String {
    let file = MapperFile {
        map: mappings.to_vec(),
    };
    // Serializing plain structs with string keys cannot fail.
    serde_json::to_string_pretty(&file).unwrap_or_default()
}

const fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Parse an octal permission string such as `"0640"`, `"640"` or `"0o640"`.
#[must_use]
pub fn parse_octal(text: &str) -> Option<u32> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0o")
        .or_else(|| text.strip_prefix("0O"))
        .unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 8).ok()
}

/// Serde adapter for permission modes.
///
/// Deserializes from an unsigned integer (as written by older configs, e.g.
/// `420`) or an octal string (`"0644"`); always serializes as an integer.
pub mod octal {
    use std::fmt;

    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};

    /// Serialize a mode as a plain integer.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(*mode)
    }

    /// Deserialize a mode from an integer or an octal string.
    ///
    /// # Errors
    ///
    /// Fails on negative or oversized integers and non-octal strings.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        deserializer.deserialize_any(ModeVisitor)
    }

    struct ModeVisitor;

    impl Visitor<'_> for ModeVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a permission mode as an integer or an octal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
            super::parse_octal(v).ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fs::MemFs;
    use std::path::PathBuf;

    #[test]
    fn wrapped_json_with_defaults() {
        let mapper = parse_json(
            br#"{"map": [{"source": "/boot/hosts", "destination": "/etc/hosts"}]}"#,
            "test",
        )
        .unwrap();
        let m = mapper.iter().next().unwrap();
        assert_eq!(m.source, PathBuf::from("/boot/hosts"));
        assert_eq!(m.destination, PathBuf::from("/etc/hosts"));
        assert_eq!(m.mode, 0o644);
        assert_eq!(m.dir_mode, 0o755);
        assert_eq!((m.uid, m.gid), (0, 0));
        assert!(!m.clobber);
    }

    #[test]
    fn bare_array_is_accepted() {
        let mapper = parse_json(
            br#"[
                {"source": "/a", "destination": "/b", "mode": 384, "clobber": true},
                {"source": "/c", "destination": "/d", "dirmode": "0700", "uid": 1000, "gid": 5}
            ]"#,
            "test",
        )
        .unwrap();
        let all: Vec<&Mapping> = mapper.iter().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].mode, 0o600);
        assert!(all[0].clobber);
        assert_eq!(all[1].dir_mode, 0o700);
        assert_eq!((all[1].uid, all[1].gid), (1000, 5));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mapper = parse_json(
            br#"{"comment": "x", "map": [{"source": "/a", "destination": "/b", "owner": "pi"}]}"#,
            "test",
        )
        .unwrap();
        assert_eq!(mapper.len(), 1);
    }

    #[test]
    fn scalar_document_is_rejected() {
        let err = parse_json(b"42", "preppi.conf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigParse);
        assert!(err.to_string().contains("found a number"));
    }

    #[test]
    fn missing_destination_is_rejected() {
        let err = parse_json(br#"[{"source": "/a"}]"#, "test").unwrap_err();
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn bad_octal_string_is_rejected() {
        let err = parse_json(
            br#"[{"source": "/a", "destination": "/b", "mode": "rw-r--r--"}]"#,
            "test",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigParse);
    }

    #[test]
    fn negative_mode_is_rejected() {
        assert!(parse_json(br#"[{"source": "/a", "destination": "/b", "mode": -1}]"#, "t").is_err());
    }

    #[test]
    fn toml_tables() {
        let mapper = parse_toml(
            r#"
            [[map]]
            source = "/boot/wpa_supplicant.conf"
            destination = "/etc/wpa_supplicant/wpa_supplicant.conf"
            mode = "0600"
            clobber = true

            [[map]]
            source = "/boot/ssh"
            destination = "/etc/ssh/sshd_config.d/preppi.conf"
            mode = 0o644
            "#,
            "test",
        )
        .unwrap();
        let all: Vec<&Mapping> = mapper.iter().collect();
        assert_eq!(all[0].mode, 0o600);
        assert!(all[0].clobber);
        assert_eq!(all[1].mode, 0o644);
    }

    #[test]
    fn parse_octal_forms() {
        assert_eq!(parse_octal("0640"), Some(0o640));
        assert_eq!(parse_octal("640"), Some(0o640));
        assert_eq!(parse_octal("0o4755"), Some(0o4755));
        assert_eq!(parse_octal(" 0755 "), Some(0o755));
        assert_eq!(parse_octal("0o"), None);
        assert_eq!(parse_octal("0968"), None);
        assert_eq!(parse_octal(""), None);
    }

    #[test]
    fn load_dispatches_on_extension() {
        let fs = MemFs::new();
        fs.write_file(
            "/boot/preppi/preppi.toml",
            "[[map]]\nsource = \"/a\"\ndestination = \"/b\"\n",
            0o644,
        )
        .unwrap();
        fs.write_file(
            "/boot/preppi/preppi.conf",
            r#"{"map": [{"source": "/a", "destination": "/b"}]}"#,
            0o644,
        )
        .unwrap();

        let from_toml = load_mapper(&fs, Path::new("/boot/preppi/preppi.toml")).unwrap();
        let from_json = load_mapper(&fs, Path::new("/boot/preppi/preppi.conf")).unwrap();
        assert_eq!(from_toml, from_json);
    }

    #[test]
    fn load_missing_file_is_unreadable() {
        let fs = MemFs::new();
        let err = load_mapper(&fs, Path::new("/boot/preppi/preppi.conf")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigUnreadable);
    }

    #[test]
    fn parse_error_names_origin() {
        let fs = MemFs::new();
        fs.write_file("/boot/preppi/preppi.conf", "{not json", 0o644)
            .unwrap();
        let err = load_mapper(&fs, Path::new("/boot/preppi/preppi.conf")).unwrap_err();
        assert!(err.to_string().contains("/boot/preppi/preppi.conf"));
    }

    #[test]
    fn written_config_loads_back() {
        let fs = MemFs::new();
        fs.create_dir_all(Path::new("/boot/preppi"), 0o755).unwrap();
        let mapper = Mapper::new(vec![
            Mapping::new("/boot/a", "/etc/a")
                .with_mode(0o600)
                .with_owner(1000, 1000),
            Mapping::new("/boot/b", "/etc/b").with_clobber(true),
        ]);
        let path = Path::new("/boot/preppi/preppi.conf");

        write_mapper(&fs, path, &mapper).unwrap();
        assert_eq!(load_mapper(&fs, path).unwrap(), mapper);
    }

    #[test]
    fn json_output_uses_numeric_modes() {
        let mapper = Mapper::new(vec![Mapping::new("/boot/a", "/etc/a").with_mode(0o600)]);
        insta::assert_snapshot!(mapper.to_json(), @r#"
        {
          "map": [
            {
              "source": "/boot/a",
              "destination": "/etc/a",
              "mode": 384,
              "dirmode": 493,
              "uid": 0,
              "gid": 0
            }
          ]
        }
        "#);
    }
}
