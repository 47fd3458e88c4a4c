mod assumption;
pub use assumption::*;

mod property_key;
pub use property_key::*;

mod value;
pub use value::*;

mod descriptor;
pub use descriptor::*;

mod interop;
pub use interop::*;

mod for_each_index;
pub use for_each_index::*;

mod copy_data_properties;
pub use copy_data_properties::*;
