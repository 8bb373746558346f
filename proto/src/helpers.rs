// Copyright (c) 2022-2023 The MobileCoin Foundation

/// serde helper module for fixed length byte arrays
///
/// Encodes `[u8; N]` as a sequence of integers, rejecting sequences
/// that are shorter or longer than `N` on decode.
pub(crate) mod arr {
    use core::fmt;

    use serde::{
        de::{self, IgnoredAny, SeqAccess, Visitor},
        Deserializer, Serializer,
    };

    pub fn serialize<S: Serializer, const N: usize>(v: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<[u8; N], D::Error> {
        d.deserialize_seq(ArrVisitor::<N>)
    }

    struct ArrVisitor<const N: usize>;

    impl<'de, const N: usize> Visitor<'de> for ArrVisitor<N> {
        type Value = [u8; N];

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "an array of {N} bytes")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = [0u8; N];

            for (i, b) in out.iter_mut().enumerate() {
                *b = match seq.next_element()? {
                    Some(v) => v,
                    None => return Err(de::Error::invalid_length(i, &self)),
                };
            }

            // Reject trailing entries
            if seq.next_element::<IgnoredAny>()?.is_some() {
                return Err(de::Error::invalid_length(N + 1, &self));
            }

            Ok(out)
        }
    }
}

#[cfg(test)]
mod test {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::arr")]
        v: [u8; 4],
    }

    #[test]
    fn arr_length_checks() {
        let w: Wrapper = serde_json::from_str(r#"{"v":[1,2,3,255]}"#).unwrap();
        assert_eq!(w.v, [1, 2, 3, 255]);

        assert_eq!(
            serde_json::to_string(&w).unwrap(),
            r#"{"v":[1,2,3,255]}"#,
        );

        // Too short, too long, and out of range
        assert!(serde_json::from_str::<Wrapper>(r#"{"v":[1,2,3]}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"v":[1,2,3,4,5]}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"v":[1,2,3,256]}"#).is_err());
    }
}
