pub mod airia;
pub mod file_store;
pub mod freepik;

pub use airia::AiriaAdapter;
pub use file_store::FileKeyValueStore;
pub use freepik::FreepikAdapter;
