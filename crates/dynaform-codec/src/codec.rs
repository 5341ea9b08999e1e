//! Codec values: explicit, injectable encoders/decoders.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use dynaform_types::{Item, WireValue};

use crate::error::ReadError;
use crate::format::Format;

/// A bidirectional mapping between `T` and a wire value.
///
/// Codecs are stateless and immutable, so a single instance can be shared by
/// any number of tables and threads. Obtain the canonical codec of a
/// [`Format`] type with [`codec`], or adapt one with [`CodecExt::xmap`].
pub trait Codec<T>: Send + Sync {
    fn write(&self, value: &T) -> WireValue;

    fn read(&self, wire: &WireValue) -> Result<T, ReadError>;

    /// Encoding for a map entry; `None` leaves the attribute out.
    fn write_field(&self, value: &T) -> Option<WireValue> {
        Some(self.write(value))
    }

    /// The value an absent attribute decodes to, if any.
    fn absent(&self) -> Option<T> {
        None
    }

    /// Decode a whole stored item.
    fn read_item(&self, item: Item) -> Result<T, ReadError> {
        self.read(&WireValue::Map(item))
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for &C {
    fn write(&self, value: &T) -> WireValue {
        (**self).write(value)
    }

    fn read(&self, wire: &WireValue) -> Result<T, ReadError> {
        (**self).read(wire)
    }

    fn write_field(&self, value: &T) -> Option<WireValue> {
        (**self).write_field(value)
    }

    fn absent(&self) -> Option<T> {
        (**self).absent()
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for Box<C> {
    fn write(&self, value: &T) -> WireValue {
        (**self).write(value)
    }

    fn read(&self, wire: &WireValue) -> Result<T, ReadError> {
        (**self).read(wire)
    }

    fn write_field(&self, value: &T) -> Option<WireValue> {
        (**self).write_field(value)
    }

    fn absent(&self) -> Option<T> {
        (**self).absent()
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for Arc<C> {
    fn write(&self, value: &T) -> WireValue {
        (**self).write(value)
    }

    fn read(&self, wire: &WireValue) -> Result<T, ReadError> {
        (**self).read(wire)
    }

    fn write_field(&self, value: &T) -> Option<WireValue> {
        (**self).write_field(value)
    }

    fn absent(&self) -> Option<T> {
        (**self).absent()
    }
}

// ---------------------------------------------------------------------------
// FormatCodec
// ---------------------------------------------------------------------------

/// The codec backed by a type's [`Format`] implementation.
pub struct FormatCodec<T>(PhantomData<fn() -> T>);

/// The canonical codec for `T`.
pub fn codec<T: Format>() -> FormatCodec<T> {
    FormatCodec(PhantomData)
}

impl<T> Clone for FormatCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FormatCodec<T> {}

impl<T> Default for FormatCodec<T> {
    fn default() -> Self {
        FormatCodec(PhantomData)
    }
}

impl<T> fmt::Debug for FormatCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormatCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T: Format> Codec<T> for FormatCodec<T> {
    fn write(&self, value: &T) -> WireValue {
        value.write()
    }

    fn read(&self, wire: &WireValue) -> Result<T, ReadError> {
        T::read(wire)
    }

    fn write_field(&self, value: &T) -> Option<WireValue> {
        value.write_field()
    }

    fn absent(&self) -> Option<T> {
        T::absent()
    }
}

// ---------------------------------------------------------------------------
// Mapped codecs
// ---------------------------------------------------------------------------

/// A codec for `B` built on a codec for `A`. See [`CodecExt::xmap`].
pub struct Xmap<C, A, F, G> {
    inner: C,
    read: F,
    write: G,
    _marker: PhantomData<fn() -> A>,
}

impl<A, B, C, F, G> Codec<B> for Xmap<C, A, F, G>
where
    C: Codec<A>,
    F: Fn(A) -> Result<B, ReadError> + Send + Sync,
    G: Fn(&B) -> A + Send + Sync,
{
    fn write(&self, value: &B) -> WireValue {
        self.inner.write(&(self.write)(value))
    }

    fn read(&self, wire: &WireValue) -> Result<B, ReadError> {
        self.inner.read(wire).and_then(&self.read)
    }

    fn write_field(&self, value: &B) -> Option<WireValue> {
        self.inner.write_field(&(self.write)(value))
    }

    fn absent(&self) -> Option<B> {
        self.inner.absent().and_then(|a| (self.read)(a).ok())
    }
}

/// A codec for `B` whose read conversion may fail with any displayable
/// error. See [`CodecExt::coerced_xmap`].
pub struct CoercedXmap<C, A, F, G> {
    inner: C,
    read: F,
    write: G,
    _marker: PhantomData<fn() -> A>,
}

impl<A, B, E, C, F, G> Codec<B> for CoercedXmap<C, A, F, G>
where
    C: Codec<A>,
    E: fmt::Display,
    F: Fn(A) -> Result<B, E> + Send + Sync,
    G: Fn(&B) -> A + Send + Sync,
{
    fn write(&self, value: &B) -> WireValue {
        self.inner.write(&(self.write)(value))
    }

    fn read(&self, wire: &WireValue) -> Result<B, ReadError> {
        let a = self.inner.read(wire)?;
        (self.read)(a).map_err(ReadError::coercion)
    }

    fn write_field(&self, value: &B) -> Option<WireValue> {
        self.inner.write_field(&(self.write)(value))
    }

    fn absent(&self) -> Option<B> {
        self.inner.absent().and_then(|a| (self.read)(a).ok())
    }
}

/// Combinators available on every codec.
pub trait CodecExt<A>: Codec<A> + Sized {
    /// Adapt this codec to `B` with a fallible read conversion and a total
    /// write conversion.
    fn xmap<B, F, G>(self, read: F, write: G) -> Xmap<Self, A, F, G>
    where
        F: Fn(A) -> Result<B, ReadError> + Send + Sync,
        G: Fn(&B) -> A + Send + Sync,
    {
        Xmap {
            inner: self,
            read,
            write,
            _marker: PhantomData,
        }
    }

    /// Like [`CodecExt::xmap`], but any read-conversion error becomes a
    /// [`ReadError::TypeCoercionFailure`].
    fn coerced_xmap<B, E, F, G>(self, read: F, write: G) -> CoercedXmap<Self, A, F, G>
    where
        E: fmt::Display,
        F: Fn(A) -> Result<B, E> + Send + Sync,
        G: Fn(&B) -> A + Send + Sync,
    {
        CoercedXmap {
            inner: self,
            read,
            write,
            _marker: PhantomData,
        }
    }

    /// Erase the concrete codec type.
    fn shared(self) -> Arc<dyn Codec<A>>
    where
        Self: 'static,
    {
        Arc::new(self)
    }
}

impl<A, C: Codec<A>> CodecExt<A> for C {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Email(String);

    fn email_codec() -> impl Codec<Email> {
        codec::<String>().coerced_xmap(
            |s: String| {
                if s.contains('@') {
                    Ok(Email(s))
                } else {
                    Err(format!("{s:?} is not an email address"))
                }
            },
            |e: &Email| e.0.clone(),
        )
    }

    #[test]
    fn format_codec_delegates_to_format() {
        let c = codec::<i32>();
        assert_eq!(c.write(&7), WireValue::number(7i64));
        assert_eq!(c.read(&WireValue::number(7i64)), Ok(7));
        assert_eq!(codec::<Option<i32>>().absent(), Some(None));
    }

    #[test]
    fn coerced_xmap_turns_conversion_errors_into_coercion_failures() {
        let c = email_codec();
        assert_eq!(c.write(&Email("a@b".into())), WireValue::string("a@b"));
        assert_eq!(c.read(&WireValue::string("a@b")), Ok(Email("a@b".into())));
        assert!(matches!(
            c.read(&WireValue::string("nope")),
            Err(ReadError::TypeCoercionFailure(_))
        ));
        assert!(matches!(
            c.read(&WireValue::Bool(true)),
            Err(ReadError::NoPropertyOfType { expected: "S", .. })
        ));
    }

    #[test]
    fn xmap_keeps_inner_absent_behaviour() {
        let c = codec::<Option<u32>>().xmap(
            |v: Option<u32>| Ok(v.unwrap_or_default()),
            |v: &u32| if *v == 0 { None } else { Some(*v) },
        );
        assert_eq!(c.absent(), Some(0));
        assert_eq!(c.write_field(&0), None);
        assert_eq!(c.read(&WireValue::number(3i64)), Ok(3));
    }

    #[test]
    fn shared_codecs_are_usable_through_arc() {
        let shared: Arc<dyn Codec<String>> = codec::<String>().shared();
        let clone = Arc::clone(&shared);
        assert_eq!(clone.read(&shared.write(&"x".to_string())), Ok("x".to_string()));
    }

    #[test]
    fn read_item_decodes_a_map() {
        let item = Item::from([("k".to_string(), WireValue::number(1i64))]);
        let c = codec::<std::collections::BTreeMap<String, i64>>();
        assert_eq!(c.read_item(item).unwrap().get("k"), Some(&1));
    }
}
