//! Builds CIP request paths (EPATHs) from Logix tag names.

/// Symbolic segment tag.
const SYMBOLIC: u8 = 0x91;
/// Element segment, 8-bit index.
const ELEMENT_8: u8 = 0x28;
/// Element segment, 16-bit index.
const ELEMENT_16: u8 = 0x29;
/// Logical segment, class, 8-bit.
pub const CLASS_8: u8 = 0x20;
/// Logical segment, instance, 8-bit.
pub const INSTANCE_8: u8 = 0x24;
/// Logical segment, instance, 16-bit.
pub const INSTANCE_16: u8 = 0x25;

/// Builds the EPATH for a tag string such as `"Program:Main.Counts[7].Setpoint"`.
///
/// Returns `None` if `tag` tokenizes to nothing (e.g. the empty string), mirroring the original
/// driver's "cannot create request packet" failure mode.
///
/// When `multi_requests` is `true`, the returned buffer is prefixed with a single byte giving the
/// path length in 16-bit words, so it can be concatenated directly into a Multiple Service Packet
/// sub-request.
pub fn build_request_path(tag: &str, multi_requests: bool) -> Option<Vec<u8>> {
    let mut path = Vec::new();

    for member in tag.split('.') {
        if member.is_empty() {
            continue;
        }

        let (name, subscripts) = split_subscripts(member);
        if !name.is_empty() {
            push_symbolic(&mut path, name);
        }
        for index in subscripts {
            push_element(&mut path, index);
        }
    }

    if path.is_empty() {
        return None;
    }

    if multi_requests {
        let words = (path.len() / 2) as u8;
        let mut out = Vec::with_capacity(path.len() + 1);
        out.push(words);
        out.extend(path);
        Some(out)
    } else {
        Some(path)
    }
}

/// Splits `"Counts[7,2]"` into `("Counts", [7, 2])`. A member with no brackets yields an empty
/// subscript list.
fn split_subscripts(member: &str) -> (&str, Vec<u32>) {
    match member.find('[') {
        None => (member, Vec::new()),
        Some(start) => {
            let name = &member[..start];
            let inner = member[start + 1..].trim_end_matches(']');
            let subscripts = inner
                .split(',')
                .filter_map(|s| s.trim().parse::<u32>().ok())
                .collect();
            (name, subscripts)
        }
    }
}

fn push_symbolic(path: &mut Vec<u8>, name: &str) {
    path.extend(symbolic_segment(name));
}

/// Builds a single symbolic EPATH segment for `name` (`0x91 <len> <ascii> [pad]`).
///
/// Exposed for callers that need to prepend a scope segment (e.g. `"Program:Main"`) ahead of a
/// class/instance path rather than a full tag path.
pub fn symbolic_segment(name: &str) -> Vec<u8> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(2 + bytes.len() + 1);
    out.push(SYMBOLIC);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    if bytes.len() % 2 != 0 {
        out.push(0x00);
    }
    out
}

fn push_element(path: &mut Vec<u8>, index: u32) {
    if index < 256 {
        path.push(ELEMENT_8);
        path.push(index as u8);
    } else {
        path.push(ELEMENT_16);
        path.push(0x00);
        path.extend_from_slice(&(index as u16).to_le_bytes());
    }
}
