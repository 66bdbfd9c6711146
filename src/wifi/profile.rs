use crate::config;
use crate::error::{WifiError, WifiResult};
use crate::wifi::types::{AuthenticationType, ConnectionMode, EncryptionType, WifiProfile};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesDecl, BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;
use secrecy::ExposeSecret;
use std::io::Cursor;
use std::str::FromStr;
use tracing::{error, info, warn};

/// Create a WiFi profile XML document in the format `netsh wlan add profile`
/// expects, tab indented.
pub fn create_profile_xml(profile: &WifiProfile) -> String {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b'\t', 1);
    if let Err(e) = write_profile(&mut writer, profile) {
        error!("Failed to write profile XML for {}: {e}", profile.name());
    }
    let xml = String::from_utf8(writer.into_inner().into_inner()).unwrap_or_default();
    info!("Generated profile XML for {}", profile.name());
    xml
}

fn write_profile<W: std::io::Write>(
    writer: &mut Writer<W>,
    profile: &WifiProfile,
) -> std::io::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut wlan_profile = BytesStart::new("WLANProfile");
    wlan_profile.push_attribute(("xmlns", config::WLAN_PROFILE_NS_V1));
    writer.write_event(Event::Start(wlan_profile))?;

    write_element(writer, "name", profile.name())?;

    writer.write_event(Event::Start(BytesStart::new("SSIDConfig")))?;
    writer.write_event(Event::Start(BytesStart::new("SSID")))?;
    write_element(writer, "hex", &profile.ssid_hex())?;
    write_element(writer, "name", profile.name())?;
    writer.write_event(Event::End(BytesEnd::new("SSID")))?;
    write_element(writer, "nonBroadcast", "false")?;
    writer.write_event(Event::End(BytesEnd::new("SSIDConfig")))?;

    write_element(writer, "connectionType", "ESS")?;
    write_element(writer, "connectionMode", profile.connection_mode.as_str())?;
    write_element(writer, "autoSwitch", bool_text(profile.auto_switch))?;

    writer.write_event(Event::Start(BytesStart::new("MSM")))?;
    writer.write_event(Event::Start(BytesStart::new("security")))?;

    writer.write_event(Event::Start(BytesStart::new("authEncryption")))?;
    write_element(writer, "authentication", profile.authentication_type.as_str())?;
    write_element(writer, "encryption", profile.encryption_type.as_str())?;
    write_element(writer, "useOneX", "false")?;
    writer.write_event(Event::End(BytesEnd::new("authEncryption")))?;

    writer.write_event(Event::Start(BytesStart::new("sharedKey")))?;
    write_element(writer, "keyType", "passPhrase")?;
    write_element(writer, "protected", "false")?;
    write_element(writer, "keyMaterial", profile.password().expose_secret())?;
    writer.write_event(Event::End(BytesEnd::new("sharedKey")))?;

    writer.write_event(Event::End(BytesEnd::new("security")))?;
    writer.write_event(Event::End(BytesEnd::new("MSM")))?;

    let mut mac_randomization = BytesStart::new("MacRandomization");
    mac_randomization.push_attribute(("xmlns", config::WLAN_PROFILE_NS_V3));
    writer.write_event(Event::Start(mac_randomization))?;
    write_element(
        writer,
        "enableRandomization",
        bool_text(profile.enable_randomization),
    )?;
    writer.write_event(Event::End(BytesEnd::new("MacRandomization")))?;

    writer.write_event(Event::End(BytesEnd::new("WLANProfile")))
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> std::io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Elements read back from a profile document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    ConnectionMode,
    AutoSwitch,
    Authentication,
    Encryption,
    KeyMaterial,
    Randomization,
}

#[derive(Debug, Default)]
struct Fields {
    name: Option<String>,
    connection_mode: Option<String>,
    auto_switch: Option<String>,
    authentication: Option<String>,
    encryption: Option<String>,
    key_material: Option<String>,
    randomization: Option<String>,
}

impl Fields {
    /// First occurrence wins
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::ConnectionMode => &mut self.connection_mode,
            Field::AutoSwitch => &mut self.auto_switch,
            Field::Authentication => &mut self.authentication,
            Field::Encryption => &mut self.encryption,
            Field::KeyMaterial => &mut self.key_material,
            Field::Randomization => &mut self.randomization,
        };
        slot.get_or_insert(value);
    }
}

fn classify(ns: &ResolveResult, local_name: &[u8], depth: usize) -> Option<Field> {
    let namespace = match ns {
        ResolveResult::Bound(Namespace(ns)) => Some(*ns),
        _ => None,
    };
    let in_v1 = namespace == Some(config::WLAN_PROFILE_NS_V1.as_bytes());
    let in_v3 = namespace == Some(config::WLAN_PROFILE_NS_V3.as_bytes());
    // Direct children of the root may also come without a namespace
    let root_child = depth == 1 && (in_v1 || namespace.is_none());

    match local_name {
        b"name" if root_child => Some(Field::Name),
        b"connectionMode" if root_child => Some(Field::ConnectionMode),
        b"autoSwitch" if root_child => Some(Field::AutoSwitch),
        b"authentication" if in_v1 => Some(Field::Authentication),
        b"encryption" if in_v1 => Some(Field::Encryption),
        b"keyMaterial" if in_v1 => Some(Field::KeyMaterial),
        b"enableRandomization" if in_v3 => Some(Field::Randomization),
        _ => None,
    }
}

fn malformed(e: impl std::fmt::Display) -> WifiError {
    WifiError::MalformedXml(e.to_string())
}

/// Resolve `&amp;`-style and numeric character references
fn resolve_reference(reference: &BytesRef) -> WifiResult<String> {
    let name = std::str::from_utf8(reference).map_err(malformed)?;
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse(),
        }
        .map_err(|_| malformed(format!("invalid character reference &{name};")))?;
        return char::from_u32(code)
            .map(String::from)
            .ok_or_else(|| malformed(format!("invalid character reference &{name};")));
    }
    resolve_predefined_entity(name)
        .map(str::to_string)
        .ok_or_else(|| malformed(format!("unknown entity &{name};")))
}

fn read_fields(xml: &str) -> WifiResult<Fields> {
    let mut reader = NsReader::from_str(xml);
    let mut fields = Fields::default();
    let mut stack: Vec<Option<Field>> = Vec::new();
    let mut text = String::new();
    let mut saw_root = false;

    let outcome = loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) => {
                let field = classify(&ns, e.local_name().as_ref(), stack.len());
                stack.push(field);
                saw_root = true;
                text.clear();
            }
            Ok((ns, Event::Empty(e))) => {
                if let Some(field) = classify(&ns, e.local_name().as_ref(), stack.len()) {
                    fields.set(field, String::new());
                }
                saw_root = true;
            }
            Ok((_, Event::Text(e))) => text.push_str(&e.xml_content().map_err(malformed)?),
            Ok((_, Event::GeneralRef(e))) => text.push_str(&resolve_reference(&e)?),
            Ok((_, Event::CData(e))) => {
                text.push_str(std::str::from_utf8(&e).map_err(malformed)?);
            }
            Ok((_, Event::End(_))) => {
                if let Some(Some(field)) = stack.pop() {
                    fields.set(field, std::mem::take(&mut text));
                }
                text.clear();
            }
            Ok((_, Event::Eof)) => break Ok(()),
            Ok(_) => (),
            Err(e) => break Err(e),
        }
    };
    outcome.map_err(|e| malformed(format!("at position {}: {e}", reader.buffer_position())))?;

    if !saw_root {
        return Err(malformed("document has no root element"));
    }
    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    Ok(fields)
}

/// Parse an optional enumerated element, falling back to `default` when it
/// is absent or carries an unknown value.
fn parse_or_default<T: FromStr + Default>(value: Option<&str>, element: &str) -> T {
    let Some(value) = value else {
        return T::default();
    };
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("Unknown {element} value {value:?}, using the default");
            T::default()
        }
    }
}

fn decode_profile(xml: &str) -> WifiResult<WifiProfile> {
    let fields = read_fields(xml)?;

    let name = fields.name.ok_or(WifiError::MissingElement("name"))?;
    let password = fields
        .key_material
        .ok_or(WifiError::MissingElement("keyMaterial"))?;

    let connection_mode: ConnectionMode =
        parse_or_default(fields.connection_mode.as_deref(), "connectionMode");
    let authentication: AuthenticationType =
        parse_or_default(fields.authentication.as_deref(), "authentication");
    let encryption: EncryptionType = parse_or_default(fields.encryption.as_deref(), "encryption");
    let auto_switch = fields.auto_switch.is_some_and(|v| v == "true");
    let enable_randomization = fields.randomization.is_none_or(|v| v == "true");

    Ok(WifiProfile::new(name, password)?
        .with_connection_mode(connection_mode)
        .with_authentication(authentication)
        .with_encryption(encryption)
        .with_auto_switch(auto_switch)
        .with_randomization(enable_randomization))
}

/// Parse a WiFi profile XML document.
///
/// `name` and the namespaced `keyMaterial` are required; every other setting
/// falls back to its default. Failures are logged before being returned.
pub fn parse_profile_xml(xml: &str) -> WifiResult<WifiProfile> {
    match decode_profile(xml) {
        Ok(profile) => {
            info!("Parsed profile XML for {}", profile.name());
            Ok(profile)
        }
        Err(e) => {
            error!("Could not parse profile XML: {e}");
            Err(e)
        }
    }
}
