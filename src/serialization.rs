use core::fmt;
use core::marker::PhantomData;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error;
use serde::de::SeqAccess;
use serde::de::Visitor;
use serde::ser::SerializeSeq;

use crate::hash_set::UnifiedSet;
use crate::strategy::HashingStrategy;

/// Upper bound on the capacity reserved from an untrusted length hint.
const MAX_PREALLOCATED: usize = 4096;

impl<T, H> Serialize for UnifiedSet<T, H>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self.iter() {
            seq.serialize_element(&element)?;
        }
        seq.end()
    }
}

impl<'de, T, H> Deserialize<'de> for UnifiedSet<T, H>
where
    T: Deserialize<'de>,
    H: HashingStrategy<T> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SetVisitor<T, H>(PhantomData<(T, H)>);

        impl<'de, T, H> Visitor<'de> for SetVisitor<T, H>
        where
            T: Deserialize<'de>,
            H: HashingStrategy<T> + Default,
        {
            type Value = UnifiedSet<T, H>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a sequence of optional set elements")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOCATED);
                let mut set = UnifiedSet::with_capacity_and_strategy(capacity, H::default());
                while let Some(element) = seq.next_element::<Option<T>>()? {
                    match element {
                        Some(value) => {
                            set.add(value);
                        }
                        None => {
                            set.add_null().map_err(A::Error::custom)?;
                        }
                    }
                }
                Ok(set)
            }
        }

        deserializer.deserialize_seq(SetVisitor(PhantomData))
    }
}
