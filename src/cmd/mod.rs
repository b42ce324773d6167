pub mod execute;
pub mod parsed_command;
pub mod pipeline;
