const DATA_TYPE_SHORTENED_LOCAL_NAME: u8 = 0x08;
const DATA_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// One length / type / value structure of advertising data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdStructure<'a> {
    pub data_type: u8,
    pub data: &'a [u8],
}

/// Iterates over the structures in raw advertising data. Stops at the first
/// zero length or truncated structure.
pub struct AdIterator<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> AdIterator<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        AdIterator { data, pos: 0 }
    }
}

impl<'a> Iterator for AdIterator<'a> {
    type Item = AdStructure<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.data.get(self.pos)? as usize;
        if len == 0 || self.pos + len >= self.data.len() {
            self.pos = self.data.len();
            return None;
        }

        let structure = AdStructure {
            data_type: self.data[self.pos + 1],
            data: &self.data[self.pos + 2..self.pos + 1 + len],
        };
        self.pos += len + 1;
        Some(structure)
    }
}

/// Whether a shortened or complete local name field in `data` starts with `name`.
pub fn contains_name(data: &[u8], name: &str) -> bool {
    AdIterator::new(data)
        .filter(|ad| ad.data_type == DATA_TYPE_SHORTENED_LOCAL_NAME || ad.data_type == DATA_TYPE_COMPLETE_LOCAL_NAME)
        .any(|ad| ad.data.starts_with(name.as_bytes()))
}

/// Builds advertising data holding a single complete local name field. Used
/// by transports that hand out parsed names instead of raw data.
pub fn encode_local_name(name: &str) -> Vec<u8> {
    let bytes = &name.as_bytes()[..name.len().min(29)];
    let mut data = Vec::with_capacity(bytes.len() + 2);
    data.push(bytes.len() as u8 + 1);
    data.push(DATA_TYPE_COMPLETE_LOCAL_NAME);
    data.extend_from_slice(bytes);
    data
}
