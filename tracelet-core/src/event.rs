//! Typed event records.
//!
//! An event is a fixed-size payload tagged with a stable type id and stamped
//! with a timestamp when it is pushed. Payload types are restricted at
//! compile time: [`EventPayload`] requires zerocopy's `IntoBytes` and
//! `Immutable`, which rule out padding, references, pointers, interior
//! mutability and trait objects, and [`Event::new`] refuses payloads larger
//! than [`EVENT_SIZE_MAX`].
//!
//! Serialized form, little-endian: `id: u32, timestamp: u64, param: T`.

use std::mem::size_of;

use zerocopy::byteorder::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{EVENT_HEADER_LEN, EVENT_SIZE_MAX};

/// A payload type that may be recorded.
///
/// ```
/// use tracelet_core::event::EventPayload;
/// use zerocopy::byteorder::little_endian::U32;
/// use zerocopy::{Immutable, IntoBytes};
///
/// #[derive(Clone, Copy, IntoBytes, Immutable)]
/// #[repr(C)]
/// struct LoopCount {
///     count: U32,
/// }
///
/// impl EventPayload for LoopCount {
///     const ID: u32 = 1;
/// }
/// ```
pub trait EventPayload: IntoBytes + Immutable + Copy + Send + 'static {
    /// Stable type identifier written into every serialized record.
    const ID: u32;
}

/// Serialized event header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EventHeader {
    pub id: U32,
    pub timestamp: U64,
}

const _: () = assert!(size_of::<EventHeader>() == EVENT_HEADER_LEN);

/// Byte view of an event, consumed by the packet builder.
pub trait RawEvent {
    /// Serialized length in bytes.
    fn raw_len(&self) -> usize;

    /// Writes the serialized bytes to the front of `out` and returns the
    /// number written. `out` is at least `raw_len()` long.
    fn write_raw(&self, out: &mut [u8]) -> usize;
}

/// A typed event record.
#[derive(Debug, Clone, Copy)]
pub struct Event<T: EventPayload> {
    header: EventHeader,
    param: T,
}

impl<T: EventPayload> Event<T> {
    const SIZE_OK: () = assert!(
        size_of::<T>() <= EVENT_SIZE_MAX,
        "event payload exceeds EVENT_SIZE_MAX"
    );

    /// Serialized length of events of this type.
    pub const RAW_LEN: usize = EVENT_HEADER_LEN + size_of::<T>();

    /// Wraps `param` with its type id and a zero timestamp.
    ///
    /// Payloads larger than [`EVENT_SIZE_MAX`] do not compile:
    ///
    /// ```compile_fail
    /// use tracelet_core::config::EVENT_SIZE_MAX;
    /// use tracelet_core::event::{Event, EventPayload};
    /// use zerocopy::{Immutable, IntoBytes};
    ///
    /// #[derive(Clone, Copy, IntoBytes, Immutable)]
    /// #[repr(C)]
    /// struct Big {
    ///     data: [u8; EVENT_SIZE_MAX + 1],
    /// }
    ///
    /// impl EventPayload for Big {
    ///     const ID: u32 = 2;
    /// }
    ///
    /// let _ = Event::new(Big { data: [0; EVENT_SIZE_MAX + 1] });
    /// ```
    ///
    /// Neither do payloads with padding bytes:
    ///
    /// ```compile_fail
    /// use tracelet_core::event::{Event, EventPayload};
    /// use zerocopy::{Immutable, IntoBytes};
    ///
    /// #[derive(Clone, Copy, IntoBytes, Immutable)]
    /// #[repr(C)]
    /// struct Padded {
    ///     flag: u8,
    ///     value: u32,
    /// }
    ///
    /// impl EventPayload for Padded {
    ///     const ID: u32 = 3;
    /// }
    ///
    /// let _ = Event::new(Padded { flag: 1, value: 2 });
    /// ```
    ///
    /// references:
    ///
    /// ```compile_fail
    /// use tracelet_core::event::{Event, EventPayload};
    /// use zerocopy::{Immutable, IntoBytes};
    ///
    /// static VALUE: u8 = 7;
    ///
    /// #[derive(Clone, Copy, IntoBytes, Immutable)]
    /// #[repr(C)]
    /// struct Borrowed {
    ///     value: &'static u8,
    /// }
    ///
    /// impl EventPayload for Borrowed {
    ///     const ID: u32 = 4;
    /// }
    ///
    /// let _ = Event::new(Borrowed { value: &VALUE });
    /// ```
    ///
    /// or interior mutability:
    ///
    /// ```compile_fail
    /// use std::cell::Cell;
    /// use tracelet_core::event::{Event, EventPayload};
    /// use zerocopy::{Immutable, IntoBytes};
    ///
    /// #[derive(Clone, IntoBytes, Immutable)]
    /// #[repr(C)]
    /// struct Shared {
    ///     value: Cell<u32>,
    /// }
    ///
    /// impl EventPayload for Shared {
    ///     const ID: u32 = 5;
    /// }
    ///
    /// let _ = Event::new(Shared { value: Cell::new(0) });
    /// ```
    ///
    /// The same shapes within the limits do:
    ///
    /// ```
    /// use tracelet_core::config::EVENT_SIZE_MAX;
    /// use tracelet_core::event::{Event, EventPayload};
    /// use zerocopy::byteorder::little_endian::U32;
    /// use zerocopy::{Immutable, IntoBytes};
    ///
    /// #[derive(Clone, Copy, IntoBytes, Immutable)]
    /// #[repr(C)]
    /// struct Fits {
    ///     flag: u8,
    ///     value: U32,
    ///     data: [u8; EVENT_SIZE_MAX - 5],
    /// }
    ///
    /// impl EventPayload for Fits {
    ///     const ID: u32 = 6;
    /// }
    ///
    /// let event = Event::new(Fits { flag: 1, value: U32::new(2), data: [0; EVENT_SIZE_MAX - 5] });
    /// assert_eq!(event.id(), 6);
    /// assert_eq!(Event::<Fits>::RAW_LEN, 12 + EVENT_SIZE_MAX);
    /// ```
    pub fn new(param: T) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::SIZE_OK;

        Self {
            header: EventHeader {
                id: U32::new(T::ID),
                timestamp: U64::ZERO,
            },
            param,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.header.id.get()
    }

    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.header.timestamp.get()
    }

    #[inline]
    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.header.timestamp.set(timestamp);
    }

    pub fn param(&self) -> &T {
        &self.param
    }

    pub fn param_mut(&mut self) -> &mut T {
        &mut self.param
    }
}

impl<T: EventPayload + Default> Default for Event<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: EventPayload> RawEvent for Event<T> {
    #[inline]
    fn raw_len(&self) -> usize {
        Self::RAW_LEN
    }

    fn write_raw(&self, out: &mut [u8]) -> usize {
        let (head, rest) = out.split_at_mut(EVENT_HEADER_LEN);
        head.copy_from_slice(self.header.as_bytes());
        let param = self.param.as_bytes();
        rest[..param.len()].copy_from_slice(param);
        Self::RAW_LEN
    }
}
