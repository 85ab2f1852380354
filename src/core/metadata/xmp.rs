//! XMP packets embedded in image files.
//!
//! Only simple properties are read: either attribute form
//! (`xmp:CreateDate="..."`) or element form
//! (`<xmp:CreateDate>...</xmp:CreateDate>`). The first occurrence of a
//! property wins.

use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn packet_pattern() -> &'static BytesRegex {
    static PATTERN: OnceLock<BytesRegex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        BytesRegex::new(r"(?s)<x:xmpmeta\b.*?</x:xmpmeta>").expect("packet pattern is a valid regex")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Za-z][\w.-]*:[A-Za-z][\w.-]*)\s*=\s*"([^"]*)""#)
            .expect("attribute pattern is a valid regex")
    })
}

fn element_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<([A-Za-z][\w.-]*:[A-Za-z][\w.-]*)(?:\s[^>]*)?>([^<]*)</([A-Za-z][\w.-]*:[A-Za-z][\w.-]*)>")
            .expect("element pattern is a valid regex")
    })
}

/// Simple properties of one XMP packet, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct XmpPacket {
    properties: HashMap<String, String>,
}

impl XmpPacket {
    /// Locate and parse the first XMP packet in a file's bytes
    pub fn find(bytes: &[u8]) -> Option<Self> {
        let packet = packet_pattern().find(bytes)?;
        Some(Self::parse(&String::from_utf8_lossy(packet.as_bytes())))
    }

    /// Parse properties out of packet text
    pub fn parse(text: &str) -> Self {
        let mut properties = HashMap::new();

        for caps in attribute_pattern().captures_iter(text) {
            properties
                .entry(caps[1].to_string())
                .or_insert_with(|| caps[2].trim().to_string());
        }

        for caps in element_pattern().captures_iter(text) {
            if caps[1] != caps[3] {
                continue;
            }
            let value = caps[2].trim();
            if value.is_empty() {
                continue;
            }
            properties
                .entry(caps[1].to_string())
                .or_insert_with(|| value.to_string());
        }

        Self { properties }
    }

    /// Value of a property such as `xmp:CreateDate`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKET: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    xmp:CreateDate="2020-08-01T12:00:00+01:00"
    xmp:ModifyDate="2020-08-02T09:30:00">
   <photoshop:DateCreated>2020-08-01T11:59:58</photoshop:DateCreated>
   <exif:DateTimeOriginal>
   </exif:DateTimeOriginal>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    #[test]
    fn reads_attribute_properties() {
        let packet = XmpPacket::parse(PACKET);
        assert_eq!(packet.get("xmp:CreateDate"), Some("2020-08-01T12:00:00+01:00"));
        assert_eq!(packet.get("xmp:ModifyDate"), Some("2020-08-02T09:30:00"));
    }

    #[test]
    fn reads_element_properties() {
        let packet = XmpPacket::parse(PACKET);
        assert_eq!(packet.get("photoshop:DateCreated"), Some("2020-08-01T11:59:58"));
        assert_eq!(packet.get("exif:DateTimeOriginal"), None);
    }

    #[test]
    fn finds_packet_inside_binary_data() {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10];
        bytes.extend_from_slice(PACKET.as_bytes());
        bytes.extend_from_slice(&[0x00, 0xFF, 0xD9]);

        let packet = XmpPacket::find(&bytes).unwrap();

        assert_eq!(packet.get("xmp:CreateDate"), Some("2020-08-01T12:00:00+01:00"));
    }

    #[test]
    fn no_packet_in_plain_bytes() {
        assert!(XmpPacket::find(b"\x89PNG\r\n\x1a\n plain pixels").is_none());
        assert!(XmpPacket::parse("").is_empty());
    }
}
