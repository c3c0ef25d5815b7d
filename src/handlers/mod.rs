pub mod funnel_handlers;
