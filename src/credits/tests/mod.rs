mod common;

mod unlock;
