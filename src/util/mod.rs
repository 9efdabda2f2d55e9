pub mod channel;
pub mod fs;
pub mod journald;
pub mod local;
pub mod mountctl;
pub mod privilege;
pub mod sealer;
pub mod ssh;
pub mod systemctl;
