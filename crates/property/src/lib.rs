//! Property bounded context: listings owned by community members.

pub mod property;

pub use property::{
    Amenities, Amenity, BedroomDetail, BedroomDetailId, Property, PropertyEvent, PropertyName,
    PropertyProps, PropertyType, RoomName,
};
