/// Byte ceiling for generated object names (materials, physics proxies).
pub const MAX_OBJECT_NAME_BYTES: usize = 21;

/// Byte ceiling the host applies to bone names.
pub const MAX_BONE_NAME_BYTES: usize = 63;

/// Name the host assigns to a bone created without one.
const DEFAULT_BONE_NAME: &str = "Bone";

/// Numeric discriminator placed in front of a raw entity name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameTemplate {
    pub prefix: &'static str,
    pub width: usize,
    pub suffix: &'static str,
}

impl NameTemplate {
    /// `00:name`
    pub const MATERIAL: Self = Self::new("", 2, ":");
    /// `r00:name`
    pub const RIGID_BODY: Self = Self::new("r", 2, ":");
    /// `j00:name`
    pub const JOINT: Self = Self::new("j", 2, ":");

    pub const fn new(prefix: &'static str, width: usize, suffix: &'static str) -> Self {
        Self {
            prefix,
            width,
            suffix,
        }
    }

    pub fn format(&self, index: usize) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }
}

/// Longest prefix of `source` whose UTF-8 encoding fits in `max_bytes`,
/// cut at a character boundary.
pub fn trim_to_byte_len(source: &str, max_bytes: usize) -> &str {
    let mut end = 0;
    for (offset, ch) in source.char_indices() {
        let next = offset + ch.len_utf8();
        if next > max_bytes {
            break;
        }
        end = next;
    }
    &source[..end]
}

/// Builds an object name from a template, an entity index and the raw name,
/// truncated to [`MAX_OBJECT_NAME_BYTES`].
///
/// A prefix longer than the budget yields a truncated prefix (or an empty
/// name); this is accepted.
pub fn make_name(template: NameTemplate, index: usize, raw_name: &str) -> String {
    let mut name = template.format(index);
    name.push_str(raw_name);
    trim_to_byte_len(&name, MAX_OBJECT_NAME_BYTES).to_string()
}

/// Name the host will give a bone created from `raw_name`.
pub fn sanitize_bone_name(raw_name: &str) -> String {
    let trimmed = trim_to_byte_len(raw_name, MAX_BONE_NAME_BYTES);
    if trimmed.is_empty() {
        DEFAULT_BONE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_short_name_when_making_name_then_prefix_is_prepended() {
        assert_eq!(make_name(NameTemplate::RIGID_BODY, 3, "head"), "r03:head");
        assert_eq!(make_name(NameTemplate::MATERIAL, 12, "skin"), "12:skin");
    }

    #[test]
    fn given_wide_index_when_making_name_then_width_is_a_minimum() {
        assert_eq!(make_name(NameTemplate::JOINT, 123, "x"), "j123:x");
    }

    #[test]
    fn given_multibyte_name_when_making_name_then_cut_falls_on_char_boundary() {
        // "j00:" is 4 bytes, each kana is 3 bytes: 4 + 5 * 3 = 19, a sixth
        // kana would need 22.
        let name = make_name(NameTemplate::JOINT, 0, "スカートの前");
        assert_eq!(name, "j00:スカートの");
        assert!(name.len() <= MAX_OBJECT_NAME_BYTES);
    }

    #[test]
    fn given_long_ascii_name_when_making_name_then_result_is_21_bytes() {
        let name = make_name(NameTemplate::MATERIAL, 1, "a_very_long_material_name");
        assert_eq!(name.len(), MAX_OBJECT_NAME_BYTES);
        assert!(name.starts_with("01:a_very"));
    }

    #[test]
    fn given_oversized_prefix_when_making_name_then_prefix_is_truncated() {
        let template = NameTemplate::new("prefix_longer_than_budget_", 2, ":");
        let name = make_name(template, 0, "tail");
        assert_eq!(name, "prefix_longer_than_bu");
    }

    #[test]
    fn given_long_and_empty_bone_names_when_sanitizing_then_host_rules_apply() {
        let long = "腕".repeat(30);
        let sanitized = sanitize_bone_name(&long);
        assert_eq!(sanitized.len(), 63);
        assert_eq!(sanitize_bone_name(""), "Bone");
        assert_eq!(sanitize_bone_name("左腕"), "左腕");
    }
}
