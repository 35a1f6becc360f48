//! External Contracts: thin RPC adapters for the STT, LLM, and TTS workers,
//! plus the handler plugin vocabulary the LLM adapter's events carry.

pub mod handler;
pub mod llm;
pub mod stt;
pub mod tts;

/// Loopback worker ports, hard defaults per spec §6 (no env overrides).
pub const TTS_PORT: u16 = 8001;
pub const STT_PORT: u16 = 8002;
pub const LLM_PORT: u16 = 8003;
