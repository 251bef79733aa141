use ic_canister_log::declare_log_buffer;

// High-priority messages: successful state transitions, liquidations.
declare_log_buffer!(name = INFO, capacity = 1000);

// Low-priority info messages: rejected operations and rollbacks.
declare_log_buffer!(name = DEBUG, capacity = 1000);

// Price fetches and normalization.
declare_log_buffer!(name = TRACE_ORACLE, capacity = 1000);
