mod common;
mod notify;
mod report;
mod workflow;
