//! Tag-oriented client for a Logix controller, layered on top of the pure `cip-proto` codec and
//! an application-supplied `Transport`.

use std::collections::{HashMap, HashSet};

use cip_proto::codec::{CipType, Value};
use cip_proto::error::DataError;
use cip_proto::model::{MemberType, Tag, Template, UdtDescriptor, UdtMember};
use cip_proto::{framer, multi, reply, strings, symbol, template as tpl};

use crate::transport::Transport;

/// Tunables that the original driver hardcoded; exposed here with the same defaults.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Encoded-byte threshold above which `write_array` splits into multiple fragments.
    pub write_fragment_threshold: usize,
    /// `DATA` member size used for `write_string`/`read_string` when the tag's own STRING type
    /// isn't known ahead of time.
    pub default_string_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            write_fragment_threshold: 450,
            default_string_size: strings::DEFAULT_SIZE,
        }
    }
}

/// Which part of the controller's tag directory to enumerate.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Controller-scope tags only.
    Controller,
    /// Tags local to a single named program.
    Program(String),
    /// Controller scope, followed by every program scope discovered while enumerating it.
    All,
}

/// A tag-oriented client connected to a single Logix controller.
#[derive(Debug)]
pub struct Client<T: Transport> {
    transport: T,
    options: Options,
    struct_cache: HashMap<u32, Template>,
    template_cache: HashMap<u32, Vec<u8>>,
    udt_cache: HashMap<u32, UdtDescriptor>,
    program_names: HashSet<String>,
    last_tag_read: Option<(String, Value)>,
    last_tag_write: Option<(String, Value)>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, Options::default())
    }

    pub fn with_options(transport: T, options: Options) -> Self {
        Self {
            transport,
            options,
            struct_cache: HashMap::new(),
            template_cache: HashMap::new(),
            udt_cache: HashMap::new(),
            program_names: HashSet::new(),
            last_tag_read: None,
            last_tag_write: None,
        }
    }

    pub fn get_last_tag_read(&self) -> Option<&(String, Value)> {
        self.last_tag_read.as_ref()
    }

    pub fn get_last_tag_write(&self) -> Option<&(String, Value)> {
        self.last_tag_write.as_ref()
    }

    fn ensure_open(&mut self) -> Result<(), DataError> {
        if !self.transport.is_connected() {
            debug!("connected session not open, issuing forward_open");
            if !self.transport.forward_open() {
                warn!("forward_open failed, session remains closed");
                return Err(DataError::new(DataError::READ, "failed to open connected session"));
            }
        }
        Ok(())
    }

    /// Sends one framed request and returns `(general_status, payload)`.
    fn exchange(&mut self, service: u8, path: &[u8], body: &[u8]) -> Result<(u8, Vec<u8>), DataError> {
        self.ensure_open()?;
        let raw = self
            .transport
            .send_unit_data(service, path, body)
            .ok_or_else(|| DataError::new(DataError::READ, "transport failed to return a reply"))?;
        let parsed = reply::classify(&raw)?;
        Ok((parsed.general_status, parsed.payload.to_vec()))
    }

    /// Reads one scalar tag (or a single bit of an integer tag, addressed as `Tag.N`).
    pub fn read_tag(&mut self, tag: &str) -> Result<(Value, CipType), DataError> {
        let (base, bit) = split_bit_suffix(tag);
        let req = framer::read_tag(&base)?;
        let (status, payload) = self.exchange(req.service, &req.path, &req.body)?;
        if !reply::is_success(status) {
            return Err(DataError::new(DataError::READ, format!("read of '{}' failed with status 0x{:02X}", tag, status)));
        }

        let (ty, mut values) = reply::decode_values(&payload)?;
        let value = values.pop().ok_or_else(|| DataError::new(DataError::READ, "read reply carried no value"))?;
        self.last_tag_read = Some((tag.to_string(), value.clone()));

        match bit {
            None => Ok((value, ty)),
            Some(b) => {
                let host = value
                    .as_i64()
                    .ok_or_else(|| DataError::new(DataError::READ, "cannot address a bit of a non-integer value"))?;
                if b >= ty.bits() {
                    return Err(DataError::new(
                        DataError::READ,
                        format!("bit {} out of range for a {}-bit {}", b, ty.bits(), ty.name()),
                    ));
                }
                Ok((Value::Bool((host >> b) & 1 != 0), CipType::Bool))
            }
        }
    }

    /// Reads several tags in one Multiple Service Packet round trip.
    ///
    /// A tag whose sub-reply failed, or whose `.N` bit suffix is out of range for its host type,
    /// comes back as `None` rather than failing the whole batch.
    pub fn read_tags(&mut self, tags: &[&str]) -> Result<Vec<(String, Option<(Value, CipType)>)>, DataError> {
        let bases_and_bits: Vec<(String, Option<u32>)> = tags.iter().map(|t| split_bit_suffix(t)).collect();
        let requests = bases_and_bits
            .iter()
            .map(|(base, _)| framer::read_tag(base))
            .collect::<Result<Vec<_>, _>>()?;

        let req = multi::build(&requests);
        let (status, payload) = self.exchange(req.service, &req.path, &req.body)?;
        if !reply::is_success(status) {
            return Err(DataError::new(DataError::READ, format!("multi-read failed with status 0x{:02X}", status)));
        }
        let sub_replies = multi::decode(&payload)?;

        let mut out = Vec::with_capacity(tags.len());
        for (tag, (_, bit)) in tags.iter().zip(bases_and_bits.iter()) {
            let sub = sub_replies.get(out.len());
            let value = match sub {
                Some(sub) if sub.status == 0x00 => sub.value.clone().and_then(|(ty, v)| match bit {
                    None => Some((v, ty)),
                    Some(b) => {
                        let host = v.as_i64()?;
                        if *b < ty.bits() {
                            Some((Value::Bool((host >> b) & 1 != 0), CipType::Bool))
                        } else {
                            None
                        }
                    }
                }),
                _ => None,
            };
            out.push((tag.to_string(), value));
        }
        Ok(out)
    }

    /// Reads `count` elements of an array tag, driving the Read Tag Fragmented continuation loop
    /// to completion.
    pub fn read_array(&mut self, tag: &str, count: u16) -> Result<Vec<Value>, DataError> {
        let mut byte_offset = 0u32;
        let mut out = Vec::new();
        loop {
            let req = framer::read_tag_fragmented(tag, count, byte_offset)?;
            let (status, payload) = self.exchange(req.service, &req.path, &req.body)?;
            if !reply::is_success(status) && !reply::is_more(status) {
                return Err(DataError::new(
                    DataError::ARRAY_READ,
                    format!("array read of '{}' failed with status 0x{:02X}", tag, status),
                ));
            }
            let (ty, values) = reply::decode_values(&payload)?;
            byte_offset += (values.len() * ty.size()) as u32;
            out.extend(values);
            if reply::is_success(status) {
                trace!("array read of '{}' complete, {} elements total", tag, out.len());
                return Ok(out);
            }
            trace!("array read of '{}' continuing at byte_offset {}", tag, byte_offset);
        }
    }

    /// Reads a Rockwell STRING tag's `LEN`/`DATA` members and reassembles the string.
    pub fn read_string(&mut self, tag: &str) -> Result<String, DataError> {
        let (len_value, _) = self.read_tag(&format!("{}.LEN", tag))?;
        let len = match len_value {
            Value::Dint(n) => n,
            _ => return Err(DataError::new(DataError::READ, "STRING's LEN member was not a DINT")),
        };
        let size = self.options.default_string_size;
        let values = self.read_array(&format!("{}.DATA", tag), size as u16)?;
        let data: Vec<i8> = values
            .into_iter()
            .map(|v| match v {
                Value::Sint(b) => b,
                _ => 0,
            })
            .collect();
        Ok(strings::decode(len, &data))
    }

    /// Writes one scalar tag (or a single bit of an integer tag via Read-Modify-Write).
    pub fn write_tag(&mut self, tag: &str, ty: CipType, value: Value) -> Result<(), DataError> {
        let (base, bit) = split_bit_suffix(tag);
        let (status, _) = match bit {
            Some(b) => {
                let truthy = matches!(value, Value::Bool(true)) || value.as_i64().map(|n| n != 0).unwrap_or(false);
                let req = framer::read_modify_write(&base, b, truthy)?;
                self.exchange(req.service, &req.path, &req.body)?
            }
            None => {
                let req = framer::write_tag(&base, ty, &value)?;
                self.exchange(req.service, &req.path, &req.body)?
            }
        };
        if !reply::is_success(status) {
            return Err(DataError::new(DataError::WRITE, format!("write of '{}' failed with status 0x{:02X}", tag, status)));
        }
        self.last_tag_write = Some((tag.to_string(), value));
        Ok(())
    }

    /// Writes several tags in one Multiple Service Packet round trip.
    ///
    /// A tuple whose request path or value can't be encoded is dropped from the batch and
    /// reported as a local failure; the rest of the batch still goes out.
    pub fn write_tags(&mut self, writes: &[(String, CipType, Value)]) -> Result<Vec<(String, Result<(), DataError>)>, DataError> {
        let mut requests = Vec::new();
        let mut labels = Vec::new();
        let mut local_errors = Vec::new();

        for (tag, ty, value) in writes {
            let (base, bit) = split_bit_suffix(tag);
            let built = match bit {
                Some(b) => {
                    let truthy = value.as_i64().map(|n| n != 0).unwrap_or(false);
                    framer::read_modify_write(&base, b, truthy)
                }
                None => framer::write_tag(&base, *ty, value),
            };
            match built {
                Ok(req) => {
                    requests.push(req);
                    labels.push(tag.clone());
                }
                Err(e) => local_errors.push((tag.clone(), e)),
            }
        }

        if requests.is_empty() {
            return Ok(local_errors.into_iter().map(|(t, e)| (t, Err(e))).collect());
        }

        let req = multi::build(&requests);
        let (status, payload) = self.exchange(req.service, &req.path, &req.body)?;
        if !reply::is_success(status) {
            return Err(DataError::new(DataError::WRITE, format!("multi-write failed with status 0x{:02X}", status)));
        }
        let sub_replies = multi::decode(&payload)?;

        let mut out: Vec<(String, Result<(), DataError>)> = labels
            .into_iter()
            .zip(sub_replies.iter())
            .map(|(tag, sub)| {
                if sub.status == 0x00 {
                    (tag, Ok(()))
                } else {
                    (tag, Err(DataError::new(DataError::WRITE, format!("write failed with status 0x{:02X}", sub.status))))
                }
            })
            .collect();

        out.extend(local_errors.into_iter().map(|(t, e)| (t, Err(e))));
        Ok(out)
    }

    /// Writes `values` to an array tag, splitting into Write Tag Fragmented requests whenever the
    /// encoded size would exceed `options.write_fragment_threshold`.
    pub fn write_array(&mut self, tag: &str, ty: CipType, values: &[Value]) -> Result<(), DataError> {
        let total = values.len() as u16;
        let mut offset = 0usize;
        let mut byte_offset = 0u32;

        while offset < values.len() {
            let mut end = offset;
            let mut bytes = 0usize;
            while end < values.len() && bytes < self.options.write_fragment_threshold {
                bytes += ty.size();
                end += 1;
            }

            let chunk = &values[offset..end];
            let req = framer::write_tag_fragmented(tag, ty, chunk, total, byte_offset)?;
            let (status, _) = self.exchange(req.service, &req.path, &req.body)?;
            if !reply::is_success(status) && !reply::is_more(status) {
                return Err(DataError::new(
                    DataError::ARRAY_WRITE,
                    format!("array write of '{}' failed with status 0x{:02X}", tag, status),
                ));
            }

            byte_offset += (chunk.len() * ty.size()) as u32;
            offset = end;
        }
        Ok(())
    }

    /// Writes a Rust string into a Rockwell STRING tag's `LEN`/`DATA` members.
    pub fn write_string(&mut self, tag: &str, value: &str) -> Result<(), DataError> {
        let size = self.options.default_string_size;
        let (len, data) = strings::encode(value, size);
        self.write_tag(&format!("{}.LEN", tag), CipType::Dint, Value::Dint(len))?;
        let values: Vec<Value> = data.into_iter().map(Value::Sint).collect();
        self.write_array(&format!("{}.DATA", tag), CipType::Sint, &values)
    }

    /// Enumerates the controller's (or a program's, or every scope's) tag directory, resolving
    /// UDT layouts for every struct tag found.
    pub fn get_tag_list(&mut self, scope: Scope) -> Result<Vec<Tag>, DataError> {
        match scope {
            Scope::Controller => self.enumerate_scope(None),
            Scope::Program(name) => self.enumerate_scope(Some(&name)),
            Scope::All => {
                let mut tags = self.enumerate_scope(None)?;
                let programs: Vec<String> = self.program_names.iter().cloned().collect();
                for name in programs {
                    tags.extend(self.enumerate_scope(Some(&name))?);
                }
                Ok(tags)
            }
        }
    }

    fn enumerate_scope(&mut self, program: Option<&str>) -> Result<Vec<Tag>, DataError> {
        let mut last_instance = 0u32;
        let mut tags = Vec::new();

        loop {
            let req = framer::get_instance_attributes_list(last_instance, program);
            let (status, payload) = self.exchange(req.service, &req.path, &req.body)?;
            let entries = symbol::decode_instance_list(&payload);
            let highest = entries.iter().map(|e| e.instance_id).max().unwrap_or(last_instance);

            for entry in &entries {
                match symbol::classify(entry) {
                    symbol::Classified::Tag(tag) => tags.push(tag),
                    symbol::Classified::ProgramHeader(name) => {
                        self.program_names.insert(name);
                    }
                    symbol::Classified::Skip => {}
                }
            }

            match symbol::next_step(status, highest)? {
                symbol::EnumerationStep::Continue(next) => {
                    debug!("symbol enumeration page returned {} entries, continuing at instance {}", entries.len(), next);
                    last_instance = next;
                }
                symbol::EnumerationStep::Done => break,
            }
        }

        for tag in &mut tags {
            if let Tag::Struct { template_instance_id, template, udt, .. } = tag {
                let id = *template_instance_id as u32;
                if let Ok(t) = self.get_structure_makeup(id) {
                    *template = Some(t);
                }
                if let Ok(u) = self.resolve_udt(id) {
                    *udt = Some(u);
                }
            }
        }

        Ok(tags)
    }

    fn get_structure_makeup(&mut self, instance_id: u32) -> Result<Template, DataError> {
        if let Some(t) = self.struct_cache.get(&instance_id) {
            trace!("structure makeup cache hit for instance {}", instance_id);
            return Ok(*t);
        }
        let req = framer::get_structure_makeup(instance_id);
        let (status, payload) = self.exchange(req.service, &req.path, &req.body)?;
        if !reply::is_success(status) {
            return Err(DataError::new(
                DataError::TAG_LIST,
                format!("get structure makeup for instance {} failed with status 0x{:02X}", instance_id, status),
            ));
        }
        let t = tpl::parse_structure_makeup(&payload)?;
        self.struct_cache.insert(instance_id, t);
        Ok(t)
    }

    fn read_template_bytes(&mut self, instance_id: u32, template: &Template) -> Result<Vec<u8>, DataError> {
        if let Some(bytes) = self.template_cache.get(&instance_id) {
            trace!("template bytes cache hit for instance {}", instance_id);
            return Ok(bytes.clone());
        }

        let total = tpl::template_byte_count(template.object_definition_size);
        let mut byte_offset = 0u32;
        let mut bytes = Vec::new();
        loop {
            let remaining = total.saturating_sub(byte_offset).min(u16::MAX as u32) as u16;
            let req = framer::read_template(instance_id, byte_offset, remaining);
            let (status, payload) = self.exchange(req.service, &req.path, &req.body)?;
            if !reply::is_success(status) && !reply::is_more(status) {
                return Err(DataError::new(
                    DataError::TAG_LIST,
                    format!("read template for instance {} failed with status 0x{:02X}", instance_id, status),
                ));
            }
            byte_offset += payload.len() as u32;
            bytes.extend(payload);
            if reply::is_success(status) {
                break;
            }
        }

        self.template_cache.insert(instance_id, bytes.clone());
        Ok(bytes)
    }

    /// Builds the full `UdtDescriptor` for `template_instance_id`, recursing into nested
    /// structure members.
    fn resolve_udt(&mut self, template_instance_id: u32) -> Result<UdtDescriptor, DataError> {
        let mut in_progress = HashSet::new();
        self.resolve_udt_inner(template_instance_id, &mut in_progress)
    }

    fn resolve_udt_inner(&mut self, instance_id: u32, in_progress: &mut HashSet<u32>) -> Result<UdtDescriptor, DataError> {
        if let Some(udt) = self.udt_cache.get(&instance_id) {
            return Ok(udt.clone());
        }
        if !in_progress.insert(instance_id) {
            warn!("cyclic template reference detected at instance {}, refusing to recurse again", instance_id);
            return Err(DataError::new(
                DataError::TAG_LIST,
                format!("cyclic template reference at instance {}", instance_id),
            ));
        }

        let template = self.get_structure_makeup(instance_id)?;
        let bytes = self.read_template_bytes(instance_id, &template)?;
        let (name, internal_tags, raw_members) = tpl::parse_template_bytes(&bytes, template.member_count)?;

        let mut members = Vec::with_capacity(raw_members.len());
        for m in raw_members {
            let member_type = match CipType::from_code(m.type_code) {
                Some(ty) => MemberType::Atomic(ty),
                None => {
                    let nested_id = (m.type_code & 0x0FFF) as u32;
                    match self.resolve_udt_inner(nested_id, in_progress) {
                        Ok(udt) => MemberType::Struct(Box::new(udt)),
                        Err(_) => MemberType::None,
                    }
                }
            };
            members.push(UdtMember { array_size: m.array_size, member_type, offset: m.offset });
        }

        in_progress.remove(&instance_id);
        let udt = UdtDescriptor { name, internal_tags, members };
        self.udt_cache.insert(instance_id, udt.clone());
        Ok(udt)
    }
}

/// Splits a tag's trailing `.N` integer suffix off as a bit index, e.g. `"Counts.3"` becomes
/// `("Counts", Some(3))`. A tag with no such suffix (or where the suffix isn't numeric, such as a
/// `.LEN`/`.DATA` member name) is returned unchanged with `None`.
fn split_bit_suffix(tag: &str) -> (String, Option<u32>) {
    if let Some(pos) = tag.rfind('.') {
        let (base, suffix) = (&tag[..pos], &tag[pos + 1..]);
        if let Ok(bit) = suffix.parse::<u32>() {
            return (base.to_string(), Some(bit));
        }
    }
    (tag.to_string(), None)
}
