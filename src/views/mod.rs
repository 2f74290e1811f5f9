pub mod field_view;
