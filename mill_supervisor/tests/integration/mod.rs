mod boot;
mod realtime;
mod signals;
