mod common;

mod conflicts;
