mod helpers;
mod relay;
mod startup;
