use num::Num;
use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ZeroSpVec;

impl<N> Serialize for ZeroSpVec<N>
where
    N: Num + Serialize + Copy,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // len, nnz, entries の3フィールド
        let mut state = serializer.serialize_struct("ZeroSpVec", 3)?;
        state.serialize_field("len", &(self.len() as u64))?;
        state.serialize_field("nnz", &(self.nnz() as u64))?;
        let entries: Vec<(u32, N)> = self
            .indices()
            .iter()
            .copied()
            .zip(self.values().iter().copied())
            .collect();
        state.serialize_field("entries", &entries)?;
        state.end()
    }
}

impl<'de, N> Deserialize<'de> for ZeroSpVec<N>
where
    N: Num + Deserialize<'de> + Copy,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ZeroSpVecData<N> {
            len: u64,
            nnz: u64,
            entries: Vec<(u32, N)>,
        }

        let data = ZeroSpVecData::deserialize(deserializer)?;
        if data.nnz as usize != data.entries.len() {
            return Err(D::Error::custom(format!(
                "nnz {} does not match {} entries",
                data.nnz,
                data.entries.len()
            )));
        }

        let len = data.len as usize;
        let mut vec = ZeroSpVec::with_capacity(len, data.entries.len());
        let mut prev: Option<u32> = None;
        for (index, value) in data.entries {
            if index as usize >= len {
                return Err(D::Error::custom(format!("index {index} out of dimension {len}")));
            }
            if prev.map_or(false, |p| p >= index) {
                return Err(D::Error::custom("entries are not strictly ascending"));
            }
            prev = Some(index);
            vec.raw_push(index, value);
        }
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbor_roundtrip_keeps_pattern() {
        let v = ZeroSpVec::from_parts(100, vec![99, 3, 42], vec![0.25f64, 1.5, -2.0]);
        let bytes = serde_cbor::to_vec(&v).unwrap();
        let back: ZeroSpVec<f64> = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn rejects_unsorted_entries() {
        #[derive(Serialize)]
        struct Raw {
            len: u64,
            nnz: u64,
            entries: Vec<(u32, f64)>,
        }
        let raw = Raw { len: 10, nnz: 2, entries: vec![(5, 1.0), (2, 1.0)] };
        let bytes = serde_cbor::to_vec(&raw).unwrap();
        assert!(serde_cbor::from_slice::<ZeroSpVec<f64>>(&bytes).is_err());

        let raw = Raw { len: 3, nnz: 1, entries: vec![(3, 1.0)] };
        let bytes = serde_cbor::to_vec(&raw).unwrap();
        assert!(serde_cbor::from_slice::<ZeroSpVec<f64>>(&bytes).is_err());
    }
}
