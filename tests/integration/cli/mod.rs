mod processes;
mod smoke;
