// Interface adapters: wire DTOs, update serialization, file storage and the headless world.

pub mod headless;
pub mod protocol;
pub mod serializer;
pub mod storage;
