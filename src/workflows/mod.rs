pub mod meals;
