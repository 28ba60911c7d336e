pub mod intersection_loader;
