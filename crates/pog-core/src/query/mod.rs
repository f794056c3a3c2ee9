pub mod assets;
pub mod guards;
pub mod layout;
pub mod lookup;
pub mod planner;
